//! In-memory vector layers built from service responses
//!
//! A [`Layer`] is assembled through a [`LayerBuilder`]: the attribute schema is fixed when the
//! builder is created, features are converted from response records and checked against that
//! schema, then the renderer and labeling are attached. Once built a layer is handed to a
//! [`MapHost`] and never changes again.
use crate::gps::Position;
use crate::host::MapHost;
use crate::Error;
use geojson::{FeatureCollection, JsonObject};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Coordinate reference system of every layer built by this crate
pub const WGS84_CRS: &str = "EPSG:4326";

/// RGBA color
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Color {
    r: u8,
    g: u8,
    b: u8,
    a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const RED: Color = Color::rgb(255, 0, 0);

    /// Opaque color from its RGB channels
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub fn to_u8_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Converts the color into HEX8 string: `#RRGGBBAA`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
    }

    /// Parses `#RRGGBB` or `#RRGGBBAA`
    pub fn try_from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if (digits.len() != 6 && digits.len() != 8) || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        let a = if digits.len() == 8 { channel(6)? } else { 255 };
        Some(Color {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a,
        })
    }
}

impl From<String> for Color {
    fn from(value: String) -> Self {
        Self::try_from_hex(&value).unwrap_or(Color::BLACK)
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_hex()
    }
}

/// Marker shapes available for point layers
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerShape {
    Circle,
}

/// Single-symbol renderer applied to every feature of a layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Renderer {
    Marker {
        shape: MarkerShape,
        color: Color,
        size: f64,
    },
    Line {
        color: Color,
        width: f64,
    },
}

impl Renderer {
    fn geometry_kind(&self) -> GeometryKind {
        match self {
            Renderer::Marker { .. } => GeometryKind::Point,
            Renderer::Line { .. } => GeometryKind::LineString,
        }
    }
}

/// Text labels drawn from one attribute field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Labeling {
    pub field: String,
    pub size: f64,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeometryKind {
    Point,
    LineString,
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryKind::Point => write!(f, "Point"),
            GeometryKind::LineString => write!(f, "LineString"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
}

impl Geometry {
    pub fn kind(&self) -> GeometryKind {
        match self {
            Geometry::Point(_) => GeometryKind::Point,
            Geometry::LineString(_) => GeometryKind::LineString,
        }
    }

    fn to_geojson(&self) -> geojson::Geometry {
        let value = match self {
            Geometry::Point(p) => geojson::Value::Point(p.to_array().to_vec()),
            Geometry::LineString(points) => geojson::Value::LineString(
                points.iter().map(|p| p.to_array().to_vec()).collect(),
            ),
        };
        geojson::Geometry::new(value)
    }

    fn from_geojson(geometry: &geojson::Geometry) -> Result<Self, Error> {
        match &geometry.value {
            geojson::Value::Point(coords) => Ok(Geometry::Point(position_from_coords(coords)?)),
            geojson::Value::LineString(line) => Ok(Geometry::LineString(
                line.iter()
                    .map(|coords| position_from_coords(coords))
                    .collect::<Result<_, _>>()?,
            )),
            _ => Err(Error::SchemaViolation(
                "only Point and LineString geometries are supported".to_string(),
            )),
        }
    }
}

fn position_from_coords(coords: &[f64]) -> Result<Position, Error> {
    match coords {
        [lon, lat, ..] => Ok(Position::new(*lon, *lat)),
        _ => Err(Error::SchemaViolation(format!(
            "a position needs 2 coordinates, got {}",
            coords.len()
        ))),
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    String,
    Double,
    Integer,
}

/// A named, typed attribute column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    name: String,
    kind: FieldKind,
}

impl Field {
    pub fn new(name: &str, kind: FieldKind) -> Self {
        Field {
            name: name.to_string(),
            kind,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Integer(i64),
    Double(f64),
    String(String),
}

impl AttributeValue {
    fn kind(&self) -> FieldKind {
        match self {
            AttributeValue::Integer(_) => FieldKind::Integer,
            AttributeValue::Double(_) => FieldKind::Double,
            AttributeValue::String(_) => FieldKind::String,
        }
    }

    /// Read a GeoJSON property back as a value of the field's kind
    fn from_json(kind: FieldKind, value: &JsonValue) -> Option<Self> {
        match kind {
            FieldKind::String => value.as_str().map(|v| AttributeValue::String(v.to_string())),
            FieldKind::Double => value.as_f64().map(AttributeValue::Double),
            FieldKind::Integer => value.as_i64().map(AttributeValue::Integer),
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            AttributeValue::Integer(v) => JsonValue::from(*v),
            AttributeValue::Double(v) => JsonValue::from(*v),
            AttributeValue::String(v) => JsonValue::from(v.as_str()),
        }
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Double(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Integer(value)
    }
}

/// One geometry plus one attribute row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    geometry: Geometry,
    attributes: Vec<AttributeValue>,
}

impl Feature {
    pub fn new(geometry: Geometry, attributes: Vec<AttributeValue>) -> Self {
        Feature {
            geometry,
            attributes,
        }
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn attributes(&self) -> &[AttributeValue] {
        &self.attributes
    }
}

/// Conversion of a typed response record into a layer feature
pub trait IntoFeature {
    fn into_feature(self) -> Result<Feature, Error>;
}

impl IntoFeature for Feature {
    fn into_feature(self) -> Result<Feature, Error> {
        Ok(self)
    }
}

/// A feature read back from a GeoJSON file, attributes are matched to the schema by name
struct GeoJsonRecord<'a> {
    schema: &'a [Field],
    feature: geojson::Feature,
}

impl IntoFeature for GeoJsonRecord<'_> {
    fn into_feature(self) -> Result<Feature, Error> {
        let geometry = self
            .feature
            .geometry
            .as_ref()
            .ok_or_else(|| Error::SchemaViolation("feature has no geometry".to_string()))?;
        let geometry = Geometry::from_geojson(geometry)?;
        let properties = self.feature.properties.unwrap_or_default();
        let attributes = self
            .schema
            .iter()
            .map(|field| {
                properties
                    .get(field.name())
                    .and_then(|value| AttributeValue::from_json(field.kind(), value))
                    .ok_or_else(|| {
                        Error::SchemaViolation(format!(
                            "property '{}' is missing or not {:?}",
                            field.name(),
                            field.kind()
                        ))
                    })
            })
            .collect::<Result<_, _>>()?;
        Ok(Feature::new(geometry, attributes))
    }
}

/// A finished, styled layer ready to be displayed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    name: String,
    crs: String,
    geometry_kind: GeometryKind,
    schema: Vec<Field>,
    features: Vec<Feature>,
    renderer: Option<Renderer>,
    labeling: Option<Labeling>,
}

impl Layer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn crs(&self) -> &str {
        &self.crs
    }

    pub fn geometry_kind(&self) -> GeometryKind {
        self.geometry_kind
    }

    pub fn schema(&self) -> &[Field] {
        &self.schema
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn renderer(&self) -> Option<&Renderer> {
        self.renderer.as_ref()
    }

    pub fn labeling(&self) -> Option<&Labeling> {
        self.labeling.as_ref()
    }

    /// Look up an attribute of a feature by field name
    pub fn attribute(&self, feature: usize, field: &str) -> Option<&AttributeValue> {
        let column = self.schema.iter().position(|f| f.name() == field)?;
        self.features.get(feature)?.attributes.get(column)
    }

    /// Export the layer as a GeoJSON feature collection, style information is stored as
    /// foreign members of the collection
    pub fn to_geojson(&self) -> Result<FeatureCollection, Error> {
        let features = self
            .features
            .iter()
            .map(|feature| {
                let properties: JsonObject = self
                    .schema
                    .iter()
                    .zip(&feature.attributes)
                    .map(|(field, value)| (field.name().to_string(), value.to_json()))
                    .collect();
                geojson::Feature {
                    bbox: None,
                    geometry: Some(feature.geometry.to_geojson()),
                    id: None,
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        let mut members = JsonObject::new();
        members.insert("name".to_string(), JsonValue::from(self.name.as_str()));
        if let Some(renderer) = &self.renderer {
            members.insert("renderer".to_string(), to_json_value(renderer)?);
        }
        if let Some(labeling) = &self.labeling {
            members.insert("labeling".to_string(), to_json_value(labeling)?);
        }

        Ok(FeatureCollection {
            bbox: None,
            features,
            foreign_members: Some(members),
        })
    }
}

fn to_json_value<T: Serialize>(value: &T) -> Result<JsonValue, Error> {
    serde_json::to_value(value).map_err(|e| Error::SchemaViolation(e.to_string()))
}

/// Assembles a [`Layer`], the schema can't change after construction
#[derive(Debug)]
pub struct LayerBuilder {
    layer: Layer,
}

impl LayerBuilder {
    /// Create an empty layer with a fixed attribute schema
    pub fn new(name: &str, geometry_kind: GeometryKind, schema: Vec<Field>) -> Self {
        LayerBuilder {
            layer: Layer {
                name: name.to_string(),
                crs: WGS84_CRS.to_string(),
                geometry_kind,
                schema,
                features: Vec::new(),
                renderer: None,
                labeling: None,
            },
        }
    }

    /// Convert every record into a feature and add them to the layer
    ///
    /// A record that can't be converted, or that doesn't match the schema, fails the whole batch
    /// and nothing is added.
    pub fn populate<I, R>(mut self, records: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = R>,
        R: IntoFeature,
    {
        let mut features = Vec::new();
        for (index, record) in records.into_iter().enumerate() {
            let feature = record
                .into_feature()
                .map_err(|e| annotate(e, &self.layer.name, index))?;
            self.check_feature(&feature)
                .map_err(|e| annotate(e, &self.layer.name, index))?;
            features.push(feature);
        }
        self.layer.features.extend(features);
        Ok(self)
    }

    /// Add the features of a collection written by [`Layer::to_geojson`]
    pub fn populate_geojson(self, collection: FeatureCollection) -> Result<Self, Error> {
        let schema = self.layer.schema.clone();
        let records: Vec<_> = collection
            .features
            .into_iter()
            .map(|feature| GeoJsonRecord {
                schema: &schema,
                feature,
            })
            .collect();
        self.populate(records)
    }

    /// Attach a single-symbol renderer, it must match the layer's geometry kind
    pub fn style(mut self, renderer: Renderer) -> Result<Self, Error> {
        if renderer.geometry_kind() != self.layer.geometry_kind {
            return Err(Error::SchemaViolation(format!(
                "{} renderer can't be used on {} layer '{}'",
                renderer.geometry_kind(),
                self.layer.geometry_kind,
                self.layer.name
            )));
        }
        self.layer.renderer = Some(renderer);
        Ok(self)
    }

    /// Label features with the values of one schema field
    pub fn label(mut self, labeling: Labeling) -> Result<Self, Error> {
        if !self.layer.schema.iter().any(|f| f.name() == labeling.field) {
            return Err(Error::SchemaViolation(format!(
                "label field '{}' is not part of layer '{}'",
                labeling.field, self.layer.name
            )));
        }
        self.layer.labeling = Some(labeling);
        Ok(self)
    }

    pub fn build(self) -> Layer {
        self.layer
    }

    /// Build the layer and hand it over to the host for display
    pub fn publish<H: MapHost + ?Sized>(self, host: &mut H) -> Result<(), Error> {
        host.add_layer(self.build())
    }

    fn check_feature(&self, feature: &Feature) -> Result<(), Error> {
        let layer = &self.layer;
        if feature.geometry.kind() != layer.geometry_kind {
            return Err(Error::SchemaViolation(format!(
                "expected {} geometry, got {}",
                layer.geometry_kind,
                feature.geometry.kind()
            )));
        }
        if let Geometry::LineString(points) = &feature.geometry {
            if points.len() < 2 {
                return Err(Error::SchemaViolation(format!(
                    "a line needs at least 2 vertices, got {}",
                    points.len()
                )));
            }
        }
        if feature.attributes.len() != layer.schema.len() {
            return Err(Error::SchemaViolation(format!(
                "expected {} attributes, got {}",
                layer.schema.len(),
                feature.attributes.len()
            )));
        }
        for (field, value) in layer.schema.iter().zip(&feature.attributes) {
            if field.kind() != value.kind() {
                return Err(Error::SchemaViolation(format!(
                    "field '{}' expects {:?}, got {:?}",
                    field.name(),
                    field.kind(),
                    value.kind()
                )));
            }
        }
        Ok(())
    }
}

fn annotate(err: Error, layer: &str, index: usize) -> Error {
    match err {
        Error::SchemaViolation(msg) => {
            Error::SchemaViolation(format!("layer '{}', record {}: {}", layer, index, msg))
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MapProject;

    fn point_layer() -> LayerBuilder {
        LayerBuilder::new(
            "points",
            GeometryKind::Point,
            vec![Field::string("Label"), Field::new("Rank", FieldKind::Integer)],
        )
    }

    fn point(lon: f64, lat: f64, label: &str, rank: i64) -> Feature {
        Feature::new(
            Geometry::Point(Position::new(lon, lat)),
            vec![label.to_string().into(), rank.into()],
        )
    }

    #[test]
    fn populate_keeps_record_order() {
        let layer = point_layer()
            .populate(vec![point(1.0, 2.0, "a", 1), point(3.0, 4.0, "b", 2)])
            .unwrap()
            .build();
        assert_eq!(layer.features().len(), 2);
        assert_eq!(layer.crs(), WGS84_CRS);
        assert_eq!(
            layer.attribute(1, "Label"),
            Some(&AttributeValue::String("b".to_string()))
        );
        assert_eq!(
            layer.features()[0].geometry(),
            &Geometry::Point(Position::new(1.0, 2.0))
        );
    }

    #[test]
    fn bad_record_aborts_batch() {
        let bad = Feature::new(
            Geometry::Point(Position::new(0.0, 0.0)),
            vec!["x".to_string().into(), AttributeValue::Double(1.5)],
        );
        match point_layer().populate(vec![point(1.0, 2.0, "a", 1), bad]) {
            Err(Error::SchemaViolation(msg)) => assert!(msg.contains("record 1")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn wrong_geometry_kind_is_rejected() {
        let line = Feature::new(
            Geometry::LineString(vec![Position::new(0.0, 0.0), Position::new(1.0, 1.0)]),
            vec!["x".to_string().into(), 1i64.into()],
        );
        assert!(point_layer().populate(vec![line]).is_err());
    }

    #[test]
    fn single_vertex_line_is_rejected() {
        let builder = LayerBuilder::new("lines", GeometryKind::LineString, vec![]);
        let line = Feature::new(Geometry::LineString(vec![Position::new(0.0, 0.0)]), vec![]);
        assert!(builder.populate(vec![line]).is_err());
    }

    #[test]
    fn renderer_must_match_geometry() {
        let line = Renderer::Line {
            color: Color::RED,
            width: 2.0,
        };
        assert!(point_layer().style(line).is_err());
    }

    #[test]
    fn label_field_must_exist() {
        let labeling = Labeling {
            field: "Title".to_string(),
            size: 10.0,
            color: Color::BLACK,
        };
        assert!(point_layer().label(labeling).is_err());
    }

    #[test]
    fn geojson_export_carries_properties_and_style() {
        let renderer = Renderer::Marker {
            shape: MarkerShape::Circle,
            color: Color::rgb(0, 124, 191),
            size: 3.0,
        };
        let layer = point_layer()
            .populate(vec![point(10.0, 20.0, "here", 3)])
            .unwrap()
            .style(renderer)
            .unwrap()
            .build();
        let collection = layer.to_geojson().unwrap();
        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["features"][0]["geometry"]["coordinates"][0], 10.0);
        assert_eq!(json["features"][0]["properties"]["Label"], "here");
        assert_eq!(json["features"][0]["properties"]["Rank"], 3);
        assert_eq!(json["renderer"]["color"], "#007CBFFF");
        assert_eq!(json["name"], "points");
    }

    #[test]
    fn layer_survives_serialization() {
        let layer = point_layer()
            .populate(vec![point(1.0, 2.0, "a", 7)])
            .unwrap()
            .build();
        let text = serde_json::to_string(&layer).unwrap();
        let back: Layer = serde_json::from_str(&text).unwrap();
        assert_eq!(back, layer);
    }

    #[test]
    fn geojson_features_read_back_into_the_schema() {
        let layer = point_layer()
            .populate(vec![point(10.0, 20.0, "here", 3), point(-1.5, 0.5, "", 0)])
            .unwrap()
            .build();
        let restored = point_layer()
            .populate_geojson(layer.to_geojson().unwrap())
            .unwrap()
            .build();
        assert_eq!(restored, layer);
    }

    #[test]
    fn geojson_feature_missing_a_property_is_rejected() {
        let collection: FeatureCollection = serde_json::from_value(serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [1.0, 2.0]},
                "properties": {"Label": "a"}
            }]
        }))
        .unwrap();
        match point_layer().populate_geojson(collection) {
            Err(Error::SchemaViolation(msg)) => assert!(msg.contains("Rank")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn publish_hands_layer_to_host() {
        let mut project = MapProject::new();
        point_layer()
            .populate(vec![point(1.0, 2.0, "a", 1)])
            .unwrap()
            .publish(&mut project)
            .unwrap();
        assert_eq!(project.layers().len(), 1);
        assert_eq!(project.layers()[0].name(), "points");
    }

    #[test]
    fn hex_colors() {
        assert_eq!(Color::rgb(255, 0, 0).to_hex(), "#FF0000FF");
        assert_eq!(Color::try_from_hex("#007CBF"), Some(Color::rgb(0, 124, 191)));
        assert_eq!(Color::try_from_hex("007CBF"), None);
    }
}
