use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::utils::haversine;

/// One store in the region. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct Store {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    /// Popularity proxy; strictly positive.
    pub weight: f64,
}

/// Global slot rules shared by every store.
#[derive(Debug, Clone, Copy)]
pub struct Rules {
    /// Total number of trading slots in the year.
    pub slot_count: usize,
    /// Required number of active slots per store.
    pub cap: usize,
    /// Upper bound on the size of a store's forbidden set.
    pub max_forbidden: usize,
}

/// Hard per-store constraints. `mandatory` and `forbidden` are disjoint.
#[derive(Debug, Clone, Default)]
pub struct StoreConstraints {
    pub mandatory: Vec<usize>,
    pub forbidden: Vec<usize>,
}

/// The read-only problem tables: store directory, global rules and per-store
/// constraints.
#[derive(Debug, Clone)]
pub struct Problem {
    pub stores: HashMap<String, Store>,
    pub rules: Rules,
    pub constraints: HashMap<String, StoreConstraints>,
}

impl Problem {
    pub fn store(&self, id: &str) -> &Store {
        self.stores
            .get(id)
            .unwrap_or_else(|| panic!("store {id} missing from directory"))
    }

    pub fn constraints_of(&self, id: &str) -> &StoreConstraints {
        self.constraints
            .get(id)
            .unwrap_or_else(|| panic!("store {id} missing from constraint table"))
    }

    /// Store ids in a stable order, so seeded runs are reproducible.
    pub fn store_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.stores.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Minimum pairwise great-circle distance between two groups of stores.
    pub fn min_cluster_distance(&self, a: &[String], b: &[String]) -> f64 {
        let mut min_dist = f64::INFINITY;
        for first in a {
            let s1 = self.store(first);
            for second in b {
                let s2 = self.store(second);
                let dist = haversine(s1.lat, s1.lon, s2.lat, s2.lon);
                if dist < min_dist {
                    min_dist = dist;
                }
            }
        }
        min_dist
    }
}

/// A cluster is an ordered list of store ids; clusters partition the universe
/// within one dispatcher round.
pub type Cluster = Vec<String>;

/// Externally consumed output: store id -> sorted list of assigned slots.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SolutionRecord(pub BTreeMap<String, Vec<usize>>);
