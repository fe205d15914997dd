//! Longitude conventions.
//!
//! Datasets declare longitudes either in [0, 360) or in [-180, 180). Requests are converted to the
//! dataset's convention before bounds checking and index resolution.

/// Returns `lon` expressed in [0, 360).
pub fn to_360(lon: f64) -> f64 {
    let wrapped = lon.rem_euclid(360.0);
    // rem_euclid can round up to the modulus for tiny negative inputs.
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// Returns `lon` expressed in [-180, 180).
pub fn to_180(lon: f64) -> f64 {
    to_360(lon + 180.0) - 180.0
}

/// Returns `lons` expressed in the convention selected by `lon_360`.
///
/// # Arguments
///
/// * `lons`: Longitudes in either convention
/// * `lon_360`: Whether the target convention is [0, 360)
pub fn normalize(lons: &[f64], lon_360: bool) -> Vec<f64> {
    let convert = if lon_360 { to_360 } else { to_180 };
    lons.iter().map(|lon| convert(*lon)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn to_360_negative() {
        assert_eq!(230.0, to_360(-130.0));
        assert_eq!(180.0, to_360(-180.0));
        assert_eq!(0.0, to_360(-360.0));
    }

    #[test]
    fn to_360_in_range() {
        for lon in [0.0, 0.5, 179.9, 230.0, 359.75] {
            assert_eq!(lon, to_360(lon));
        }
    }

    #[test]
    fn to_360_wraps() {
        assert_eq!(0.0, to_360(360.0));
        assert_eq!(10.0, to_360(370.0));
    }

    #[test]
    fn to_180_positive() {
        assert_eq!(-130.0, to_180(230.0));
        assert_eq!(-180.0, to_180(180.0));
        assert_eq!(-0.25, to_180(359.75));
    }

    #[test]
    fn to_180_in_range() {
        for lon in [-180.0, -130.0, -0.5, 0.0, 45.0, 179.5] {
            assert_eq!(lon, to_180(lon));
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let lons = [-179.5, -130.0, 0.0, 45.25, 179.0];
        let lons_180 = normalize(&lons, false);
        assert_eq!(lons.to_vec(), lons_180);
        let lons_360 = normalize(&lons, true);
        assert_eq!(lons_360, normalize(&lons_360, true));
    }

    #[test]
    fn normalize_round_trip() {
        let lons = [230.0, 235.0, 0.0, 90.5];
        let lons_180 = normalize(&lons, false);
        assert_eq!(vec![-130.0, -125.0, 0.0, 90.5], lons_180);
        assert_eq!(lons.to_vec(), normalize(&lons_180, true));
    }
}
