use tracing::warn;

use crate::annotation::{MonomerCall, RawCluster};
use crate::bundle::{DatabaseBundle, EntityBundles};
use crate::domain::{Method, Orientation, Role, UnknownEntityPolicy};
use crate::error::TallyError;
use crate::projection::{Cell, Namespace, Projection, Schema};
use crate::registry::NameRegistry;

const SMCOG_OFFSET: u32 = 1000;
const SMCOG_LEN: usize = 301;

/// Counts of smCOG family hits for families `OFFSET..OFFSET + LEN`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainHistogram {
    buckets: [u64; SMCOG_LEN],
}

impl Default for DomainHistogram {
    fn default() -> Self {
        Self {
            buckets: [0; SMCOG_LEN],
        }
    }
}

impl DomainHistogram {
    pub const OFFSET: u32 = SMCOG_OFFSET;
    pub const LEN: usize = SMCOG_LEN;

    pub fn bucket_for(family_id: u32) -> Result<usize, TallyError> {
        family_id
            .checked_sub(Self::OFFSET)
            .map(|bucket| bucket as usize)
            .filter(|bucket| *bucket < Self::LEN)
            .ok_or(TallyError::DomainOutOfRange(family_id))
    }

    /// `family_id` is the absolute smCOG number (`SMCOG1062` is 1062), not an offset-relative
    /// id: family [`Self::OFFSET`] lands in bucket 0 and anything below it is out of range.
    pub fn record(&mut self, family_id: u32) -> Result<usize, TallyError> {
        let bucket = Self::bucket_for(family_id)?;
        self.buckets[bucket] += 1;
        Ok(bucket)
    }

    pub fn get(&self, bucket: usize) -> Option<u64> {
        self.buckets.get(bucket).copied()
    }

    pub fn column_name(bucket: usize) -> String {
        format!("SMCOG{}", bucket as u32 + Self::OFFSET)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, u64)> + '_ {
        self.buckets.iter().copied().enumerate()
    }
}

/// What happened to the parts of a raw record that could not be counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateReport {
    pub dropped_calls: usize,
    pub dropped_smcogs: usize,
}

/// One gene cluster's feature record, seeded from the name registry at construction.
#[derive(Debug, Clone)]
pub struct Cluster {
    name: String,
    directory_name: String,
    cluster_type: String,
    l_aminoacids: EntityBundles,
    d_aminoacids: EntityBundles,
    starter_l_asn: DatabaseBundle,
    starter_d_asn: DatabaseBundle,
    serpro: DatabaseBundle,
    epimerization: u64,
    smcogs: DomainHistogram,
}

impl Cluster {
    pub fn new(
        name: impl Into<String>,
        directory_name: impl Into<String>,
        registry: &NameRegistry,
    ) -> Self {
        let mut l_aminoacids = EntityBundles::new();
        let mut d_aminoacids = EntityBundles::new();
        registry.seed(&mut l_aminoacids, Orientation::L);
        registry.seed(&mut d_aminoacids, Orientation::D);
        Self {
            name: name.into(),
            directory_name: directory_name.into(),
            cluster_type: String::new(),
            l_aminoacids,
            d_aminoacids,
            starter_l_asn: DatabaseBundle::new(),
            starter_d_asn: DatabaseBundle::new(),
            serpro: DatabaseBundle::new(),
            epimerization: 0,
            smcogs: DomainHistogram::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory_name(&self) -> &str {
        &self.directory_name
    }

    pub fn cluster_type(&self) -> &str {
        &self.cluster_type
    }

    pub fn epimerization(&self) -> u64 {
        self.epimerization
    }

    pub fn aminoacids(&self, orientation: Orientation) -> &EntityBundles {
        match orientation {
            Orientation::L => &self.l_aminoacids,
            Orientation::D => &self.d_aminoacids,
        }
    }

    pub fn role(&self, role: Role) -> &DatabaseBundle {
        match role {
            Role::StarterL => &self.starter_l_asn,
            Role::StarterD => &self.starter_d_asn,
            Role::SerPro => &self.serpro,
        }
    }

    pub fn smcogs(&self) -> &DomainHistogram {
        &self.smcogs
    }

    /// Fills the record from one parsed annotation entry.
    ///
    /// Calls naming an unregistered entity are handled per `policy`; under
    /// [`UnknownEntityPolicy::SkipCluster`] the first one aborts population with
    /// [`TallyError::UnknownEntity`]. Unknown prediction methods always fail with
    /// [`TallyError::InvalidKey`]. smCOG ids outside the histogram are dropped.
    pub fn populate(
        &mut self,
        raw: &RawCluster,
        policy: UnknownEntityPolicy,
    ) -> Result<PopulateReport, TallyError> {
        let mut report = PopulateReport::default();
        self.cluster_type = raw.product.clone();
        self.epimerization += raw.epimerization;

        for call in &raw.monomers {
            match self.apply_call(call) {
                Ok(()) => {}
                Err(err @ TallyError::UnknownEntity { .. }) => match policy {
                    UnknownEntityPolicy::SkipCluster => return Err(err),
                    UnknownEntityPolicy::DropCall => {
                        warn!("cluster {}: dropping call: {err}", self.name);
                        report.dropped_calls += 1;
                    }
                },
                Err(err) => return Err(err),
            }
        }

        for family_id in &raw.smcogs {
            if let Err(err) = self.smcogs.record(*family_id) {
                warn!("cluster {}: {err}", self.name);
                report.dropped_smcogs += 1;
            }
        }
        Ok(report)
    }

    fn apply_call(&mut self, call: &MonomerCall) -> Result<(), TallyError> {
        // Validate every method before touching a bundle so a bad call changes nothing.
        let predictions = call
            .predictions
            .iter()
            .map(|(method, count)| Ok((method.parse::<Method>()?, *count)))
            .collect::<Result<Vec<_>, TallyError>>()?;

        let bundle = match call.role.as_deref() {
            Some(kind) => match Role::resolve(kind, call.orientation)? {
                Role::StarterL => &mut self.starter_l_asn,
                Role::StarterD => &mut self.starter_d_asn,
                Role::SerPro => &mut self.serpro,
            },
            None => {
                let entities = match call.orientation {
                    Orientation::L => &mut self.l_aminoacids,
                    Orientation::D => &mut self.d_aminoacids,
                };
                entities
                    .get_mut(&call.name)
                    .ok_or_else(|| TallyError::UnknownEntity {
                        name: call.name.clone(),
                        orientation: call.orientation,
                    })?
            }
        };
        for (method, count) in predictions {
            bundle.add(method, count);
        }
        Ok(())
    }

    pub fn project(&self) -> Projection {
        let mut row = Projection::with_capacity(self.column_count());
        row.push("fileName", Cell::Text(self.directory_name.clone()));
        row.push("clusterName", Cell::Text(self.name.clone()));
        row.push("clusterType", Cell::Text(self.cluster_type.clone()));
        row.push("epimerization", Cell::Count(self.epimerization));
        for orientation in Orientation::ALL {
            for (entity, bundle) in self.aminoacids(orientation).iter() {
                bundle.project(
                    &mut row,
                    Namespace::ByOrientation {
                        orientation,
                        entity,
                    },
                );
            }
        }
        for role in Role::ALL {
            self.role(role).project(&mut row, Namespace::ByRole(role));
        }
        for (bucket, count) in self.smcogs.iter() {
            row.push(DomainHistogram::column_name(bucket), Cell::Count(count));
        }
        row
    }

    fn column_count(&self) -> usize {
        Schema::IDENTITY_COLUMNS.len()
            + (self.l_aminoacids.len() + self.d_aminoacids.len() + Role::ALL.len())
                * Method::ALL.len()
            + DomainHistogram::LEN
    }
}

impl Schema {
    /// Columns every cluster seeded from `registry` projects, in order.
    pub fn from_registry(registry: &NameRegistry) -> Self {
        let mut columns = Schema::IDENTITY_COLUMNS
            .iter()
            .map(|column| column.to_string())
            .collect::<Vec<_>>();
        for orientation in Orientation::ALL {
            let mut seeded = EntityBundles::new();
            registry.seed(&mut seeded, orientation);
            for (entity, _) in seeded.iter() {
                let namespace = Namespace::ByOrientation {
                    orientation,
                    entity,
                };
                columns.extend(Method::ALL.iter().map(|method| namespace.column_name(*method)));
            }
        }
        for role in Role::ALL {
            let namespace = Namespace::ByRole(role);
            columns.extend(Method::ALL.iter().map(|method| namespace.column_name(*method)));
        }
        columns.extend((0..DomainHistogram::LEN).map(DomainHistogram::column_name));
        Schema::new(columns)
    }
}
