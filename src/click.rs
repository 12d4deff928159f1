//! Capture a single map click and write its WGS84 coordinates into an input field pair
use crate::gps::Position;
use crate::Error;
use log::debug;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

/// Equatorial radius used by the spherical (web) mercator projection, in meters
const EARTH_RADIUS: f64 = 6_378_137.0;

/// Coordinate reference systems a map view can be displayed in
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewCrs {
    /// EPSG:4326, plain longitude / latitude degrees
    #[serde(rename = "EPSG:4326")]
    Wgs84,
    /// EPSG:3857, spherical mercator meters
    #[serde(rename = "EPSG:3857")]
    WebMercator,
}

impl ViewCrs {
    pub fn code(self) -> &'static str {
        match self {
            ViewCrs::Wgs84 => "EPSG:4326",
            ViewCrs::WebMercator => "EPSG:3857",
        }
    }

    /// Transform a point in this coordinate system into longitude / latitude
    pub fn to_wgs84(self, x: f64, y: f64) -> Position {
        match self {
            ViewCrs::Wgs84 => Position::new(x, y),
            ViewCrs::WebMercator => {
                let lon = (x / EARTH_RADIUS).to_degrees();
                let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - PI / 2.0).to_degrees();
                Position::new(lon, lat)
            }
        }
    }
}

impl FromStr for ViewCrs {
    type Err = Error;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        match src.trim().to_ascii_uppercase().as_ref() {
            "EPSG:4326" | "4326" | "WGS84" => Ok(ViewCrs::Wgs84),
            "EPSG:3857" | "3857" | "WEBMERCATOR" => Ok(ViewCrs::WebMercator),
            _ => Err(Error::InvalidConfigurationValue(format!(
                "unsupported coordinate system '{}', expected EPSG:4326 or EPSG:3857",
                src
            ))),
        }
    }
}

/// Which pair of coordinate fields a click is written to
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CaptureTarget {
    SearchPosition,
    RouteStart,
    RouteEnd,
}

/// Longitude / latitude text inputs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPair {
    pub longitude: String,
    pub latitude: String,
}

impl FieldPair {
    pub fn new(longitude: &str, latitude: &str) -> Self {
        FieldPair {
            longitude: longitude.to_string(),
            latitude: latitude.to_string(),
        }
    }

    /// Parse the text of both fields into a position
    pub fn position(&self) -> Result<Position, Error> {
        Position::parse(&self.longitude, &self.latitude)
    }

    fn set(&mut self, position: Position) {
        self.longitude = position.longitude().to_string();
        self.latitude = position.latitude().to_string();
    }
}

/// Every coordinate input a click can fill in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinateFields {
    pub search: FieldPair,
    pub route_start: FieldPair,
    pub route_end: FieldPair,
}

impl CoordinateFields {
    /// Field pair selected by a capture target
    pub fn pair_mut(&mut self, target: CaptureTarget) -> &mut FieldPair {
        match target {
            CaptureTarget::SearchPosition => &mut self.search,
            CaptureTarget::RouteStart => &mut self.route_start,
            CaptureTarget::RouteEnd => &mut self.route_end,
        }
    }
}

/// Map tool that converts the next click into coordinates for one target
///
/// Each activation handles exactly one click, later clicks are ignored until the capture is
/// activated again. Activating while already armed replaces the previous target.
#[derive(Debug, Default)]
pub struct ClickCapture {
    target: Option<CaptureTarget>,
}

impl ClickCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn activate(&mut self, target: CaptureTarget) {
        self.target = Some(target);
    }

    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }

    /// Process a click at view coordinates `(x, y)`, returns true if a field pair was updated
    pub fn handle_click(
        &mut self,
        x: f64,
        y: f64,
        crs: ViewCrs,
        fields: &mut CoordinateFields,
    ) -> bool {
        match self.target.take() {
            Some(target) => {
                let position = crs.to_wgs84(x, y);
                debug!(
                    "Map click at ({}, {}) in {} captured as {} for {:?}",
                    x,
                    y,
                    crs.code(),
                    position,
                    target
                );
                fields.pair_mut(target).set(position);
                true
            }
            None => false,
        }
    }
}
