// Spherical geometry for tour location searches

use std::str::FromStr;

use super::errors::DomainError;

pub const EARTH_RADIUS_KM: f64 = 6378.1;
pub const EARTH_RADIUS_MI: f64 = 3963.2;
const EARTH_RADIUS_M: f64 = EARTH_RADIUS_KM * 1000.0;

const LATLNG_MESSAGE: &str = "Please provide latitude & longitude in form of lat,lng";

/// Distance unit from the `:unit` path segment; anything but `mi` means kilometers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceUnit {
    Miles,
    Kilometers,
}

impl DistanceUnit {
    pub fn from_param(unit: &str) -> Self {
        if unit == "mi" {
            DistanceUnit::Miles
        } else {
            DistanceUnit::Kilometers
        }
    }

    /// Converts a search distance into an angular radius in radians
    pub fn radius_radians(self, distance: f64) -> f64 {
        match self {
            DistanceUnit::Miles => distance / EARTH_RADIUS_MI,
            DistanceUnit::Kilometers => distance / EARTH_RADIUS_KM,
        }
    }

    /// Factor turning meters into this unit
    pub fn meters_multiplier(self) -> f64 {
        match self {
            DistanceUnit::Miles => 0.000621371,
            DistanceUnit::Kilometers => 0.001,
        }
    }
}

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl FromStr for LatLng {
    type Err = DomainError;

    /// Parses the `lat,lng` path segment
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::InvalidInput(LATLNG_MESSAGE.to_string());
        let (lat, lng) = raw.split_once(',').ok_or_else(invalid)?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(invalid());
        }

        Ok(LatLng { lat, lng })
    }
}

/// Great-circle angle between two points in radians (haversine)
pub fn angular_distance(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * h.sqrt().min(1.0).asin()
}

pub fn distance_meters(a: LatLng, b: LatLng) -> f64 {
    angular_distance(a, b) * EARTH_RADIUS_M
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOS_ANGELES: LatLng = LatLng { lat: 34.111745, lng: -118.113491 };
    const SAN_DIEGO: LatLng = LatLng { lat: 32.715736, lng: -117.161087 };

    #[test]
    fn parses_latlng() {
        let point: LatLng = "34.111745,-118.113491".parse().unwrap();
        assert_eq!(point, LOS_ANGELES);
    }

    #[test]
    fn rejects_malformed_latlng() {
        for raw in ["34.1", "abc,def", "34.1,", "91,10", "10,181"] {
            let err = raw.parse::<LatLng>().unwrap_err();
            assert_eq!(err.to_string(), LATLNG_MESSAGE, "input {raw}");
        }
    }

    #[test]
    fn distance_between_cities() {
        let km = distance_meters(LOS_ANGELES, SAN_DIEGO) / 1000.0;
        assert!((km - 180.0).abs() < 5.0, "got {km}");
    }

    #[test]
    fn zero_distance_to_self() {
        assert_eq!(angular_distance(SAN_DIEGO, SAN_DIEGO), 0.0);
    }

    #[test]
    fn unit_conversions() {
        assert_eq!(DistanceUnit::from_param("mi"), DistanceUnit::Miles);
        assert_eq!(DistanceUnit::from_param("km"), DistanceUnit::Kilometers);
        assert_eq!(DistanceUnit::from_param("furlongs"), DistanceUnit::Kilometers);
        assert!((DistanceUnit::Miles.radius_radians(3963.2) - 1.0).abs() < 1e-12);
        assert_eq!(DistanceUnit::Kilometers.meters_multiplier(), 0.001);
    }
}
