//! Swiss LV95 / LV03 to WGS84 conversion.
//!
//! Uses the swisstopo approximate formulas, accurate to about one metre
//! inside Switzerland, which is well below the resolution of the accident
//! locations.

/// Converts Swiss grid coordinates to WGS84 `(latitude, longitude)`.
///
/// Accepts LV95 (`E` around 2,600,000) as well as legacy LV03 (`y` around
/// 600,000) coordinates.
#[must_use]
pub fn to_wgs84(east: f64, north: f64) -> (f64, f64) {
    let (east_origin, north_origin) = if east >= 2_000_000.0 {
        (2_600_000.0, 1_200_000.0)
    } else {
        (600_000.0, 200_000.0)
    };

    let y = (east - east_origin) / 1_000_000.0;
    let x = (north - north_origin) / 1_000_000.0;

    let lon = 0.0436f64.mul_add(
        -y.powi(3),
        0.1306f64.mul_add(
            y * x.powi(2),
            0.791_484f64.mul_add(y * x, 4.728_982f64.mul_add(y, 2.677_909_4)),
        ),
    );
    let lat = 0.0140f64.mul_add(
        -x.powi(3),
        0.0447f64.mul_add(
            -(y.powi(2) * x),
            0.002_528f64.mul_add(
                -x.powi(2),
                0.270_978f64.mul_add(-y.powi(2), 3.238_272f64.mul_add(x, 16.902_389_2)),
            ),
        ),
    );

    // Results are in units of 10000", convert to degrees.
    (lat * 100.0 / 36.0, lon * 100.0 / 36.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bern_origin() {
        let (lat, lon) = to_wgs84(2_600_000.0, 1_200_000.0);
        assert!((lat - 46.951_08).abs() < 1e-4, "lat {lat}");
        assert!((lon - 7.438_64).abs() < 1e-4, "lon {lon}");
    }

    #[test]
    fn lv03_matches_lv95() {
        let lv95 = to_wgs84(2_683_248.0, 1_247_851.0);
        let lv03 = to_wgs84(683_248.0, 247_851.0);
        assert!((lv95.0 - lv03.0).abs() < 1e-9);
        assert!((lv95.1 - lv03.1).abs() < 1e-9);
    }

    #[test]
    fn zurich_lands_near_zurich() {
        let (lat, lon) = to_wgs84(2_683_248.0, 1_247_851.0);
        assert!((lat - 47.37).abs() < 0.02, "lat {lat}");
        assert!((lon - 8.54).abs() < 0.02, "lon {lon}");
    }
}
