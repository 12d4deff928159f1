//! Module with GPS specific structures
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stores a single geospatial point in WGS84 (EPSG:4326) degrees
///
/// Serialized as a `[longitude, latitude]` pair, which is the format every Location Service
/// endpoint uses for positions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Position {
    /// longitude coordinate in degrees
    longitude: f64,
    /// latitude coordinate in degrees
    latitude: f64,
}

impl Position {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Position {
            longitude,
            latitude,
        }
    }

    /// Create a position from coordinate text fields, validating the degree ranges
    pub fn parse(longitude: &str, latitude: &str) -> Result<Self, Error> {
        let lon = parse_degrees(longitude, "longitude", 180.0)?;
        let lat = parse_degrees(latitude, "latitude", 90.0)?;
        Ok(Position::new(lon, lat))
    }

    /// Return longitude in degrees
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Return latitude in degrees
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Return the position as a `[lon, lat]` pair
    pub fn to_array(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

impl From<[f64; 2]> for Position {
    fn from(value: [f64; 2]) -> Self {
        Position::new(value[0], value[1])
    }
}

impl From<Position> for [f64; 2] {
    fn from(value: Position) -> Self {
        value.to_array()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.longitude, self.latitude)
    }
}

fn parse_degrees(src: &str, name: &str, limit: f64) -> Result<f64, Error> {
    let value: f64 = src.trim().parse().map_err(|_| {
        Error::InvalidCoordinate(format!("{} must be a number, got '{}'", name, src))
    })?;
    if !value.is_finite() || value.abs() > limit {
        return Err(Error::InvalidCoordinate(format!(
            "{} must be between -{} and {}, got {}",
            name, limit, limit, value
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parse_text_fields() {
        let pos = Position::parse(" 139.767 ", "35.681").unwrap();
        approx::assert_relative_eq!(pos.longitude(), 139.767);
        approx::assert_relative_eq!(pos.latitude(), 35.681);
    }

    #[rstest]
    #[case("abc", "10")]
    #[case("10", "")]
    #[case("181", "0")]
    #[case("0", "-90.5")]
    #[case("NaN", "0")]
    fn reject_invalid_text(#[case] lon: &str, #[case] lat: &str) {
        match Position::parse(lon, lat) {
            Err(Error::InvalidCoordinate(_)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn serializes_as_lon_lat_pair() {
        let json = serde_json::to_string(&Position::new(-122.5, 47.25)).unwrap();
        assert_eq!(json, "[-122.5,47.25]");
        let pos: Position = serde_json::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(pos, Position::new(1.0, 2.0));
    }
}
