//! Great-circle distance helpers for the help-center locator.

use crate::models::HelpCenter;

/// Mean Earth radius used by the Haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometres between two `(lat, lon)` points given in degrees.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

pub fn valid_coordinates(lat: f64, lon: f64) -> bool {
    lat.is_finite() && lon.is_finite() && (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

/// Linear scan for the closest center. Centers whose stored coordinates don't parse are skipped.
/// Ties keep the earlier center.
pub fn nearest<'a, I>(origin: (f64, f64), centers: I) -> Option<(&'a HelpCenter, f64)>
where
    I: IntoIterator<Item = &'a HelpCenter>,
{
    let mut best: Option<(&HelpCenter, f64)> = None;
    for center in centers {
        let Some(coords) = center.coordinates() else {
            continue;
        };
        let distance = haversine_km(origin, coords);
        match best {
            Some((_, d)) if d <= distance => {}
            _ => best = Some((center, distance)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::HelpCenterType;

    fn center(id: i64, lat: &str, lon: &str) -> HelpCenter {
        HelpCenter {
            id,
            name_en: format!("Center {id}"),
            name_sw: format!("Kituo {id}"),
            description_en: None,
            description_sw: None,
            latitude: lat.to_string(),
            longitude: lon.to_string(),
            address: None,
            phone: None,
            email: None,
            website: None,
            kind: HelpCenterType::Ngo,
            created_at: Default::default(),
            updated_at: Default::default(),
        }
    }

    #[test]
    fn zero_distance_to_self() {
        assert!(haversine_km((-1.2921, 36.8219), (-1.2921, 36.8219)).abs() < 1e-9);
    }

    #[test]
    fn nairobi_to_mombasa() {
        // ~440 km as the crow flies
        let d = haversine_km((-1.2921, 36.8219), (-4.0435, 39.6682));
        assert!((430.0..450.0).contains(&d), "got {d}");
    }

    #[test]
    fn nearest_picks_literal_closest() {
        let centers = vec![
            center(1, "-1.2921", "36.8219"),
            center(2, "-1.2864", "36.8172"),
            center(3, "-1.3028", "36.7073"),
        ];

        let (hit, d) = nearest((-1.3000, 36.7100), &centers).unwrap();
        assert_eq!(hit.id, 3);
        assert!(d < 1.0);

        let (hit, _) = nearest((-1.2860, 36.8170), &centers).unwrap();
        assert_eq!(hit.id, 2);
    }

    #[test]
    fn nearest_skips_unparseable_and_keeps_first_tie() {
        let centers = vec![
            center(1, "not-a-number", "36.8"),
            center(2, "-1.2921", "36.8219"),
            center(3, "-1.2921", "36.8219"),
        ];
        let (hit, _) = nearest((0.0, 0.0), &centers).unwrap();
        assert_eq!(hit.id, 2);
    }

    #[test]
    fn nearest_of_nothing() {
        let centers: Vec<HelpCenter> = Vec::new();
        assert!(nearest((0.0, 0.0), &centers).is_none());
    }

    #[test]
    fn coordinate_ranges() {
        assert!(valid_coordinates(-1.29, 36.82));
        assert!(!valid_coordinates(91.0, 0.0));
        assert!(!valid_coordinates(0.0, -181.0));
        assert!(!valid_coordinates(f64::NAN, 0.0));
    }
}
