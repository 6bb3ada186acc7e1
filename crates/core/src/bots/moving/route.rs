//! Route-band classification: deterministic, offline, driven by the
//! locality table.

use crate::bots::moving::localities::{find_locality, Locality};
use crate::domain::lead::{RouteBand, RouteClassification};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlng / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

// Distance thresholds for routes that are neither same-city nor same-metro.
const SHORT_MAX_KM: f64 = 100.0;
const LONG_MAX_KM: f64 = 200.0;

/// Classify the route between two address texts.
///
/// Either end unresolved falls back to `inter_region_short` — conservative
/// enough to price, cheap enough not to scare the user away.
pub fn classify_route(addr_from: &str, addr_to: &str) -> RouteClassification {
    let from = find_locality(addr_from);
    let to = find_locality(addr_to);

    let (Some(from), Some(to)) = (from, to) else {
        return RouteClassification {
            band: RouteBand::InterRegionShort,
            distance_km: None,
            from_names: from.map(Locality::names),
            to_names: to.map(Locality::names),
        };
    };

    let distance = haversine_km(from.lat, from.lng, to.lat, to.lng);
    let distance_rounded = (distance * 100.0).round() / 100.0;

    let band = if from.key == to.key {
        RouteBand::SameCity
    } else if from.metro.is_some() && from.metro == to.metro {
        RouteBand::SameMetro
    } else if distance <= SHORT_MAX_KM {
        RouteBand::InterRegionShort
    } else if distance <= LONG_MAX_KM {
        RouteBand::InterRegionLong
    } else {
        RouteBand::CrossCountry
    };

    RouteClassification {
        band,
        distance_km: Some(distance_rounded),
        from_names: Some(from.names()),
        to_names: Some(to.names()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_matches_known_distance() {
        // Haifa to Tel Aviv is roughly 80-90 km.
        let d = haversine_km(32.7940, 34.9896, 32.0853, 34.7818);
        assert!((75.0..95.0).contains(&d), "got {d}");
    }

    #[test]
    fn same_city_wins_over_distance() {
        let route = classify_route("Хайфа, ул. Герцль", "Haifa, downtown");
        assert_eq!(route.band, RouteBand::SameCity);
        assert_eq!(route.distance_km, Some(0.0));
    }

    #[test]
    fn metro_cluster_classifies_as_same_metro() {
        let route = classify_route("Тель-Авив", "Рамат-Ган");
        assert_eq!(route.band, RouteBand::SameMetro);
        let krayot = classify_route("Хайфа", "Кирьят-Ата");
        assert_eq!(krayot.band, RouteBand::SameMetro);
    }

    #[test]
    fn distance_bands_escalate() {
        let short = classify_route("Хайфа", "Тель-Авив");
        assert_eq!(short.band, RouteBand::InterRegionShort);
        let long = classify_route("Хайфа", "Беэр-Шева");
        assert_eq!(long.band, RouteBand::InterRegionLong);
        let mid = classify_route("Хайфа", "Иерусалим");
        assert_eq!(mid.band, RouteBand::InterRegionLong);
        let extreme = classify_route("Эйлат", "Тель-Авив");
        assert_eq!(extreme.band, RouteBand::CrossCountry);
    }

    #[test]
    fn unknown_ends_fall_back_conservatively() {
        let route = classify_route("деревня неизвестная", "Хайфа");
        assert_eq!(route.band, RouteBand::InterRegionShort);
        assert_eq!(route.distance_km, None);
        assert!(route.from_names.is_none());
        assert!(route.to_names.is_some());
    }

    #[test]
    fn names_are_localized() {
        let route = classify_route("Haifa", "Tel Aviv");
        let from = route.from_names.unwrap();
        assert_eq!(from.get("ru").map(String::as_str), Some("Хайфа"));
        assert_eq!(from.get("he").map(String::as_str), Some("חיפה"));
    }
}
