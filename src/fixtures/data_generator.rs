use rand::seq::IteratorRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::config::constant::{MAX_WORKS, REF_LAT, REF_LON, YEAR};
use crate::domain::types::{Problem, Rules, Store, StoreConstraints};
use crate::setup::build_problem;
use crate::utils::count_sundays;

/// Seeded synthetic region with the configured yearly slot count and cap.
pub fn generate_problem(store_count: usize, seed: u64) -> Problem {
    generate_problem_with(store_count, count_sundays(YEAR), MAX_WORKS, seed)
}

/// Seeded synthetic region with explicit slot count and cap. Constraints stay
/// feasible by construction: the forbidden set never exceeds
/// `slot_count - cap`, which leaves every store enough available slots.
pub fn generate_problem_with(
    store_count: usize,
    slot_count: usize,
    cap: usize,
    seed: u64,
) -> Problem {
    assert!(cap <= slot_count, "cap {cap} exceeds slot count {slot_count}");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let max_forbidden = slot_count - cap;

    let mut stores = Vec::with_capacity(store_count);
    let mut constraints = std::collections::HashMap::with_capacity(store_count);
    for i in 0..store_count {
        let id = format!("store/{i:04}");
        stores.push(Store {
            id: id.clone(),
            lon: REF_LON + rng.gen_range(-0.6..0.6),
            lat: REF_LAT + rng.gen_range(-0.4..0.4),
            weight: rng.gen_range(50..=5000) as f64,
        });

        let mandatory_count = rng.gen_range(0..=cap);
        let mandatory: Vec<usize> = (0..slot_count).choose_multiple(&mut rng, mandatory_count);
        let forbidden_count = rng.gen_range(0..=max_forbidden);
        let forbidden: Vec<usize> = (0..slot_count)
            .filter(|s| !mandatory.contains(s))
            .choose_multiple(&mut rng, forbidden_count);
        constraints.insert(id, StoreConstraints { mandatory, forbidden });
    }

    let rules = Rules {
        slot_count,
        cap,
        max_forbidden,
    };

    info!(
        "Generated {} stores over {} slots (cap {})",
        store_count, slot_count, cap
    );

    build_problem(stores, rules, constraints).expect("generated problem must be valid")
}
