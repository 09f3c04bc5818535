use std::collections::BTreeMap;

use bgc_tally::annotation::{MonomerCall, RawCluster};
use bgc_tally::cluster::Cluster;
use bgc_tally::domain::{Orientation, UnknownEntityPolicy};
use bgc_tally::projection::{Cell, Schema};
use bgc_tally::registry::{NameRegistry, NameSets};

fn registry() -> NameRegistry {
    NameRegistry::with_known(NameSets {
        l: vec!["ala".to_string(), "gly".to_string(), "val".to_string()],
        d: vec!["ala".to_string(), "phe".to_string()],
    })
}

fn call(name: &str, orientation: Orientation, method: &str) -> MonomerCall {
    let mut predictions = BTreeMap::new();
    predictions.insert(method.to_string(), 1);
    MonomerCall {
        name: name.to_string(),
        orientation,
        role: None,
        predictions,
    }
}

#[test]
fn disjoint_clusters_project_identical_columns() {
    let registry = registry();
    let mut first = Cluster::new("cluster-1", "Streptomyces_a", &registry);
    first
        .populate(
            &RawCluster {
                name: "cluster-1".to_string(),
                product: "nrps".to_string(),
                monomers: vec![call("ala", Orientation::L, "pHMM")],
                smcogs: vec![1001],
                ..RawCluster::default()
            },
            UnknownEntityPolicy::DropCall,
        )
        .unwrap();

    let mut second = Cluster::new("cluster-7", "Streptomyces_b", &registry);
    second
        .populate(
            &RawCluster {
                name: "cluster-7".to_string(),
                product: "t1pks-nrps".to_string(),
                monomers: vec![
                    call("phe", Orientation::D, "SANDPUMA ensemble"),
                    call("val", Orientation::L, "Stachelhaus code"),
                ],
                epimerization: 1,
                smcogs: vec![1300],
                ..RawCluster::default()
            },
            UnknownEntityPolicy::DropCall,
        )
        .unwrap();

    let first_row = first.project();
    let second_row = second.project();
    assert!(first_row.columns().eq(second_row.columns()));
    assert_eq!(Schema::from_registry(&registry).mismatch(&first_row), None);

    assert_eq!(first_row.get("pHMM_l_ala"), Some(&Cell::Count(1)));
    assert_eq!(second_row.get("pHMM_l_ala"), Some(&Cell::Count(0)));
    assert_eq!(second_row.get("SANDPUMA ensemble_d_phe"), Some(&Cell::Count(1)));
    assert_eq!(first_row.get("SANDPUMA ensemble_d_phe"), Some(&Cell::Count(0)));
    assert_eq!(first_row.get("SMCOG1001"), Some(&Cell::Count(1)));
    assert_eq!(second_row.get("SMCOG1300"), Some(&Cell::Count(1)));
    assert_eq!(
        second_row.get("clusterType"),
        Some(&Cell::Text("t1pks-nrps".to_string()))
    );
}

#[test]
fn registered_but_unseen_entities_are_zero_columns() {
    let registry = registry();
    let cluster = Cluster::new("c", "dir", &registry);
    let row = cluster.project();
    for entity in ["ala", "gly", "val"] {
        for method in ["Stachelhaus code", "pHMM", "NRPSPredictor3 SVM", "SANDPUMA ensemble"] {
            assert_eq!(
                row.get(&format!("{method}_l_{entity}")),
                Some(&Cell::Count(0))
            );
        }
    }
    assert_eq!(row.get("pHMM_d_gly"), None);
    assert_eq!(row.get("epimerization"), Some(&Cell::Count(0)));
    assert_eq!(row.get("clusterType"), Some(&Cell::Text(String::new())));
}

#[test]
fn layout_changes_only_with_registry() {
    let narrow = NameRegistry::new();
    let row = Cluster::new("c", "dir", &narrow).project();
    assert_eq!(row.len(), 4 + 3 * 4 + 301);
    assert_eq!(Schema::from_registry(&narrow).len(), row.len());
    assert_ne!(Schema::from_registry(&registry()).len(), row.len());
}
