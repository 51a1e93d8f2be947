pub mod constant {
    /// Fixed seed so whole runs are reproducible end to end.
    pub const SEED: usize = 64;

    /// Largest influence radius a store can reach (km) when it is the only
    /// active store on a slot.
    pub const MAX_RADIUS_OF_INFLUENCE: f64 = 3.0;

    /// Reference point for the equirectangular projection (regional centre).
    pub const REF_LAT: f64 = 45.1;
    pub const REF_LON: f64 = 15.2;

    pub const EARTH_RADIUS_KM: f64 = 6371.0;

    /// Calendar year the trading slots are drawn from.
    pub const YEAR: i32 = 2025;

    /// Required number of active slots per store.
    pub const MAX_WORKS: usize = 14;

    pub const STORE_COUNT: usize = 40;

    pub const MAX_IN_CLUSTER: usize = 10;
    pub const JOIN_CLUSTER_AMOUNT: usize = 3;
}
