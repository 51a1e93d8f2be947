use chrono::{Datelike, NaiveDate, Weekday};

use crate::config::constant::{EARTH_RADIUS_KM, REF_LAT, REF_LON};

/// Great-circle distance between two coordinates in kilometers.
pub fn haversine(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Project a coordinate onto a local planar (x, y) frame in kilometers using
/// an equirectangular approximation about the regional reference point.
pub fn latlon_to_xy(lat: f64, lon: f64) -> (f64, f64) {
    let x = EARTH_RADIUS_KM * (lon - REF_LON).to_radians() * REF_LAT.to_radians().cos();
    let y = EARTH_RADIUS_KM * (lat - REF_LAT).to_radians();
    (x, y)
}

/// Number of Sundays in the given calendar year, i.e. the slot count.
pub fn count_sundays(year: i32) -> usize {
    let mut sundays = 0;
    let mut date = NaiveDate::from_ymd_opt(year, 1, 1).expect("invalid year");
    while date.year() == year {
        if date.weekday() == Weekday::Sun {
            sundays += 1;
        }
        date = date.succ_opt().expect("date out of range");
    }
    sundays
}
