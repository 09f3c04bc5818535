use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::TallyError;

/// Monomer prediction methods reported by antiSMASH 4 for NRPS adenylation domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Method {
    StachelhausCode,
    Phmm,
    NrpsPredictor3Svm,
    SandpumaEnsemble,
}

impl Method {
    pub const ALL: [Method; 4] = [
        Method::StachelhausCode,
        Method::Phmm,
        Method::NrpsPredictor3Svm,
        Method::SandpumaEnsemble,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::StachelhausCode => "Stachelhaus code",
            Method::Phmm => "pHMM",
            Method::NrpsPredictor3Svm => "NRPSPredictor3 SVM",
            Method::SandpumaEnsemble => "SANDPUMA ensemble",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = TallyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Method::ALL
            .into_iter()
            .find(|method| method.as_str() == value)
            .ok_or_else(|| TallyError::InvalidKey(value.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    L,
    D,
}

impl Orientation {
    pub const ALL: [Orientation; 2] = [Orientation::L, Orientation::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::L => "l",
            Orientation::D => "d",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = TallyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "l" => Ok(Orientation::L),
            "d" => Ok(Orientation::D),
            _ => Err(TallyError::InvalidOrientation(value.to_string())),
        }
    }
}

/// Derived monomer roles that get a single bundle per cluster instead of one per entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    StarterL,
    StarterD,
    SerPro,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::StarterL, Role::StarterD, Role::SerPro];

    pub fn column_suffix(&self) -> &'static str {
        match self {
            Role::StarterL => "starter_l_asn",
            Role::StarterD => "starter_d_asn",
            Role::SerPro => "ser_pro",
        }
    }

    /// Starter units split by orientation; the serine/proline slot does not.
    pub fn resolve(kind: &str, orientation: Orientation) -> Result<Self, TallyError> {
        match (kind, orientation) {
            ("starter", Orientation::L) => Ok(Role::StarterL),
            ("starter", Orientation::D) => Ok(Role::StarterD),
            ("ser_pro", _) => Ok(Role::SerPro),
            _ => Err(TallyError::InvalidRole(kind.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownEntityPolicy {
    /// Drop the offending prediction call and keep the rest of the cluster.
    DropCall,
    /// Skip the whole cluster, so no row undercounts its monomers.
    #[default]
    SkipCluster,
}

impl fmt::Display for UnknownEntityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownEntityPolicy::DropCall => write!(f, "drop-call"),
            UnknownEntityPolicy::SkipCluster => write!(f, "skip-cluster"),
        }
    }
}

/// Genus key of a top-level batch directory: the text before the first separator.
pub fn genus_key<'a>(directory_name: &'a str, separator: &str) -> &'a str {
    if separator.is_empty() {
        return directory_name;
    }
    directory_name
        .split_once(separator)
        .map(|(head, _)| head)
        .unwrap_or(directory_name)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn method_names_round_trip() {
        for method in Method::ALL {
            assert_eq!(method.as_str().parse::<Method>().unwrap(), method);
        }
    }

    #[test]
    fn unknown_method_is_invalid_key() {
        let err = "BLAST".parse::<Method>().unwrap_err();
        assert_matches!(err, TallyError::InvalidKey(name) if name == "BLAST");
    }

    #[test]
    fn role_resolution() {
        assert_eq!(Role::resolve("starter", Orientation::D).unwrap(), Role::StarterD);
        assert_eq!(Role::resolve("ser_pro", Orientation::L).unwrap(), Role::SerPro);
        assert_matches!(
            Role::resolve("extender", Orientation::L),
            Err(TallyError::InvalidRole(_))
        );
    }

    #[test]
    fn genus_key_takes_prefix() {
        assert_eq!(genus_key("Streptomyces_coelicolor_A3", "_"), "Streptomyces");
        assert_eq!(genus_key("Amycolatopsis", "_"), "Amycolatopsis");
        assert_eq!(genus_key("Nocardia-sp", ""), "Nocardia-sp");
    }
}
