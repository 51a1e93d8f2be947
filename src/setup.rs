use std::collections::HashMap;
use std::error::Error;

use rand::Rng;
use tracing::{debug, info};

use crate::domain::types::{Cluster, Problem, Rules, Store, StoreConstraints};
use crate::utils::haversine;

/// Assemble and validate the read-only problem tables.
pub fn build_problem(
    stores: Vec<Store>,
    rules: Rules,
    constraints: HashMap<String, StoreConstraints>,
) -> Result<Problem, Box<dyn Error>> {
    let mut directory = HashMap::with_capacity(stores.len());
    for store in stores {
        if store.weight <= 0.0 {
            return Err(format!("store {} has non-positive weight", store.id).into());
        }
        directory.insert(store.id.clone(), store);
    }

    for id in directory.keys() {
        let cons = constraints
            .get(id)
            .ok_or_else(|| format!("store {id} missing from constraint table"))?;
        if cons.mandatory.len() > rules.cap {
            return Err(format!("store {id} has more mandatory slots than the cap").into());
        }
        if cons.forbidden.len() > rules.max_forbidden {
            return Err(format!("store {id} exceeds the forbidden-slot bound").into());
        }
        if cons.mandatory.iter().any(|s| cons.forbidden.contains(s)) {
            return Err(format!("store {id} has overlapping mandatory/forbidden slots").into());
        }
        if let Some(slot) = cons
            .mandatory
            .iter()
            .chain(&cons.forbidden)
            .find(|&&s| s >= rules.slot_count)
        {
            return Err(format!("store {id} references out-of-range slot {slot}").into());
        }
    }

    info!(
        "Problem assembled: {} stores, {} slots, cap {}",
        directory.len(),
        rules.slot_count,
        rules.cap
    );

    Ok(Problem {
        stores: directory,
        rules,
        constraints,
    })
}

/// Greedy proximity clustering: seed a cluster with a random unclustered
/// store, keep attaching the nearest unclustered store while it stays under
/// the size and distance thresholds, then close the cluster and start over.
pub fn make_clusters<R: Rng>(
    problem: &Problem,
    max_in_cluster: usize,
    max_distance: f64,
    rng: &mut R,
) -> Vec<Cluster> {
    let mut remaining = problem.store_ids();
    let mut clusters: Vec<Cluster> = Vec::new();

    while !remaining.is_empty() {
        let seed = remaining.swap_remove(rng.gen_range(0..remaining.len()));
        let mut cluster = vec![seed];

        while cluster.len() < max_in_cluster && !remaining.is_empty() {
            let mut closest: Option<(usize, f64)> = None;
            for (j, id) in remaining.iter().enumerate() {
                let candidate = problem.store(id);
                let mut dist = f64::INFINITY;
                for member in &cluster {
                    let m = problem.store(member);
                    dist = dist.min(haversine(m.lat, m.lon, candidate.lat, candidate.lon));
                }
                if closest.map_or(true, |(_, best)| dist < best) {
                    closest = Some((j, dist));
                }
            }

            match closest {
                Some((j, dist)) if dist < max_distance => {
                    cluster.push(remaining.swap_remove(j));
                }
                _ => break,
            }
        }

        debug!("closed cluster of {} stores", cluster.len());
        clusters.push(cluster);
    }

    clusters
}
