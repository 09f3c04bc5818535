use std::fmt;

use crate::domain::{Method, Orientation, Role};

/// A single rendered value of a projected row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Count(u64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(value) => f.write_str(value),
            Cell::Count(value) => write!(f, "{value}"),
        }
    }
}

/// How a bundle's method columns are named when projected.
#[derive(Debug, Clone, Copy)]
pub enum Namespace<'a> {
    Plain,
    ByOrientation {
        orientation: Orientation,
        entity: &'a str,
    },
    ByRole(Role),
}

impl Namespace<'_> {
    pub fn column_name(&self, method: Method) -> String {
        match self {
            Namespace::Plain => method.as_str().to_string(),
            Namespace::ByOrientation {
                orientation,
                entity,
            } => format!("{method}_{orientation}_{entity}"),
            Namespace::ByRole(role) => format!("{method}_{}", role.column_suffix()),
        }
    }
}

/// Ordered column/value pairs for one cluster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    entries: Vec<(String, Cell)>,
}

impl Projection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, column: impl Into<String>, cell: Cell) {
        self.entries.push((column.into(), cell));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(column, _)| column.as_str())
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.entries.iter().map(|(_, cell)| cell)
    }

    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, cell)| cell)
    }

    /// Tab-separated values terminated by a newline.
    pub fn row_line(&self) -> String {
        join_line(self.cells().map(|cell| cell.to_string()))
    }
}

/// Column layout shared by every row of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<String>,
}

impl Schema {
    pub const IDENTITY_COLUMNS: [&'static str; 4] =
        ["fileName", "clusterName", "clusterType", "epimerization"];

    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn header_line(&self) -> String {
        join_line(self.columns.iter().cloned())
    }

    /// Index of the first column where `projection` departs from the schema.
    pub fn mismatch(&self, projection: &Projection) -> Option<usize> {
        let position = self
            .columns
            .iter()
            .zip(projection.columns())
            .position(|(expected, found)| expected != found);
        match position {
            Some(index) => Some(index),
            None if self.columns.len() != projection.len() => {
                Some(self.columns.len().min(projection.len()))
            }
            None => None,
        }
    }
}

fn join_line(fields: impl Iterator<Item = String>) -> String {
    let mut line = fields
        .map(|field| sanitize(&field))
        .collect::<Vec<_>>()
        .join("\t");
    line.push('\n');
    line
}

// Tabs and line breaks inside a value would shift every following column.
fn sanitize(field: &str) -> String {
    if field.contains(['\t', '\n', '\r']) {
        field.replace(['\t', '\n', '\r'], " ")
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_column_names() {
        let method = Method::NrpsPredictor3Svm;
        assert_eq!(Namespace::Plain.column_name(method), "NRPSPredictor3 SVM");
        assert_eq!(
            Namespace::ByOrientation {
                orientation: Orientation::D,
                entity: "ala",
            }
            .column_name(method),
            "NRPSPredictor3 SVM_d_ala"
        );
        assert_eq!(
            Namespace::ByRole(Role::SerPro).column_name(method),
            "NRPSPredictor3 SVM_ser_pro"
        );
    }

    #[test]
    fn row_line_replaces_embedded_tabs() {
        let mut projection = Projection::new();
        projection.push("clusterType", Cell::Text("nrps\tt1pks".to_string()));
        projection.push("epimerization", Cell::Count(2));
        assert_eq!(projection.row_line(), "nrps t1pks\t2\n");
    }

    #[test]
    fn schema_detects_short_and_renamed_rows() {
        let schema = Schema::new(vec!["a".to_string(), "b".to_string()]);
        let mut short = Projection::new();
        short.push("a", Cell::Count(0));
        assert_eq!(schema.mismatch(&short), Some(1));

        let mut renamed = Projection::new();
        renamed.push("a", Cell::Count(0));
        renamed.push("c", Cell::Count(0));
        assert_eq!(schema.mismatch(&renamed), Some(1));

        let mut exact = Projection::new();
        exact.push("a", Cell::Count(0));
        exact.push("b", Cell::Count(0));
        assert_eq!(schema.mismatch(&exact), None);
        assert_eq!(schema.header_line(), "a\tb\n");
    }
}
