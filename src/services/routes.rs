//! Route calculation between two positions
use super::{encode_segment, expand_base_url, key_query, ApiClient};
use crate::config::FromFeatureConfig;
use crate::gps::Position;
use crate::host::MapHost;
use crate::layer::{
    AttributeValue, Color, Feature, Field, FieldKind, Geometry, GeometryKind, IntoFeature, Layer,
    LayerBuilder, Renderer,
};
use crate::settings::{SettingKey, Settings};
use crate::Error;
use log::info;
use serde::{Deserialize, Serialize};

pub static FIELD_DISTANCE: &str = "Distance";
pub static FIELD_DURATION: &str = "DurationSeconds";

/// Options for the `routes` feature section of the config file
#[derive(Clone, Debug, FromFeatureConfig)]
pub struct RoutesOptions {
    pub base_url: String,
}

impl Default for RoutesOptions {
    fn default() -> Self {
        RoutesOptions {
            base_url: "https://routes.geo.{region}.amazonaws.com".to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CalculateRouteRequest {
    departure_position: Position,
    destination_position: Position,
    /// sent as the string "true", which the endpoint accepts
    include_leg_geometry: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CalculateRouteResponse {
    pub legs: Vec<Leg>,
}

/// One leg of a route, distance and duration are both required
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Leg {
    pub geometry: LegGeometry,
    pub distance: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LegGeometry {
    pub line_string: Vec<Position>,
}

impl IntoFeature for Leg {
    fn into_feature(self) -> Result<Feature, Error> {
        if !self.duration_seconds.is_finite() {
            return Err(Error::SchemaViolation(format!(
                "invalid leg duration: {}",
                self.duration_seconds
            )));
        }
        // the duration column holds whole seconds
        let duration = self.duration_seconds.round() as i64;
        Ok(Feature::new(
            Geometry::LineString(self.geometry.line_string),
            vec![
                AttributeValue::Double(self.distance),
                AttributeValue::Integer(duration),
            ],
        ))
    }
}

/// URL of the calculate route endpoint of the configured route calculator
pub fn calculate_route_url(settings: &Settings, options: &RoutesOptions) -> String {
    format!(
        "{}/routes/v0/calculators/{}/calculate/route?{}",
        expand_base_url(&options.base_url, settings.get(SettingKey::Region)),
        encode_segment(settings.get(SettingKey::Routes)),
        key_query("key", settings.get(SettingKey::ApiKey))
    )
}

/// Calculates routes and shows every leg as a red line
#[derive(Clone, Debug, Default)]
pub struct RouteCalculator {
    options: RoutesOptions,
}

impl RouteCalculator {
    pub fn new(options: RoutesOptions) -> Self {
        RouteCalculator { options }
    }

    /// Send the route request
    pub fn calculate(
        &self,
        settings: &Settings,
        client: &ApiClient,
        start: Position,
        end: Position,
    ) -> Result<CalculateRouteResponse, Error> {
        settings.require(SettingKey::Region)?;
        settings.require(SettingKey::Routes)?;
        settings.require(SettingKey::ApiKey)?;
        let request = CalculateRouteRequest {
            departure_position: start,
            destination_position: end,
            include_leg_geometry: "true",
        };
        let response: CalculateRouteResponse =
            client.post_json(&calculate_route_url(settings, &self.options), &request)?;
        info!(
            "Route from {} to {} has {} legs",
            start,
            end,
            response.legs.len()
        );
        Ok(response)
    }

    /// Build the line layer, named after the route calculator
    pub fn layer(
        &self,
        settings: &Settings,
        response: CalculateRouteResponse,
    ) -> Result<Layer, Error> {
        Ok(self.layer_builder(settings, response)?.build())
    }

    fn layer_builder(
        &self,
        settings: &Settings,
        response: CalculateRouteResponse,
    ) -> Result<LayerBuilder, Error> {
        let name = settings.require(SettingKey::Routes)?;
        let schema = vec![
            Field::new(FIELD_DISTANCE, FieldKind::Double),
            Field::new(FIELD_DURATION, FieldKind::Integer),
        ];
        let renderer = Renderer::Line {
            color: Color::RED,
            width: 2.0,
        };
        LayerBuilder::new(name, GeometryKind::LineString, schema)
            .populate(response.legs)?
            .style(renderer)
    }

    /// Calculate a route and publish its legs
    pub fn add_to_map<H: MapHost + ?Sized>(
        &self,
        settings: &Settings,
        client: &ApiClient,
        start: Position,
        end: Position,
        host: &mut H,
    ) -> Result<(), Error> {
        let response = self.calculate(settings, client, start, end)?;
        self.layer_builder(settings, response)?.publish(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MapProject;
    use crate::services::client::mock;
    use serde_json::json;

    fn settings() -> Settings {
        Settings::in_memory(&[
            (SettingKey::Region, "us-east-1"),
            (SettingKey::Routes, "explore.route-calculator"),
            (SettingKey::ApiKey, "v1.public.key"),
        ])
    }

    #[test]
    fn url_has_calculator_and_key() {
        assert_eq!(
            calculate_route_url(&settings(), &RoutesOptions::default()),
            "https://routes.geo.us-east-1.amazonaws.com/routes/v0/calculators/explore.route-calculator/calculate/route?key=v1.public.key"
        );
    }

    #[test]
    fn single_leg_becomes_one_line() {
        let (client, transport) = mock::client();
        transport.respond(
            r#"{"Legs": [{"Geometry": {"LineString": [[0, 0], [1, 1]]},
                          "Distance": 5.2, "DurationSeconds": 60}],
                "Summary": {"Distance": 5.2}}"#,
        );
        let mut project = MapProject::new();
        RouteCalculator::default()
            .add_to_map(
                &settings(),
                &client,
                Position::new(0.0, 0.0),
                Position::new(1.0, 1.0),
                &mut project,
            )
            .unwrap();

        let layer = &project.layers()[0];
        assert_eq!(layer.name(), "explore.route-calculator");
        assert_eq!(layer.geometry_kind(), GeometryKind::LineString);
        assert_eq!(layer.features().len(), 1);
        assert_eq!(
            layer.features()[0].geometry(),
            &Geometry::LineString(vec![Position::new(0.0, 0.0), Position::new(1.0, 1.0)])
        );
        assert_eq!(
            layer.attribute(0, FIELD_DISTANCE),
            Some(&AttributeValue::Double(5.2))
        );
        assert_eq!(
            layer.attribute(0, FIELD_DURATION),
            Some(&AttributeValue::Integer(60))
        );
        assert!(layer.labeling().is_none());
    }

    #[test]
    fn request_asks_for_leg_geometry() {
        let (client, transport) = mock::client();
        transport.respond(r#"{"Legs": []}"#);
        RouteCalculator::default()
            .calculate(
                &settings(),
                &client,
                Position::new(-123.1, 49.2),
                Position::new(-122.3, 47.6),
            )
            .unwrap();
        assert_eq!(
            transport.requests()[0].body,
            Some(json!({
                "DeparturePosition": [-123.1, 49.2],
                "DestinationPosition": [-122.3, 47.6],
                "IncludeLegGeometry": "true"
            }))
        );
    }

    #[test]
    fn missing_duration_is_a_schema_violation() {
        let (client, transport) = mock::client();
        transport.respond(
            r#"{"Legs": [{"Geometry": {"LineString": [[0, 0], [1, 1]]}, "Distance": 5.2}]}"#,
        );
        let result = RouteCalculator::default().calculate(
            &settings(),
            &client,
            Position::new(0.0, 0.0),
            Position::new(1.0, 1.0),
        );
        assert!(matches!(result, Err(Error::SchemaViolation(_))));
    }

    #[test]
    fn degenerate_leg_aborts_the_layer() {
        let response: CalculateRouteResponse = serde_json::from_value(json!({
            "Legs": [
                {"Geometry": {"LineString": [[0, 0], [1, 1]]}, "Distance": 1.0, "DurationSeconds": 10},
                {"Geometry": {"LineString": [[1, 1]]}, "Distance": 0.0, "DurationSeconds": 0}
            ]
        }))
        .unwrap();
        let result = RouteCalculator::default().layer(&settings(), response);
        match result {
            Err(Error::SchemaViolation(msg)) => assert!(msg.contains("record 1")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn degenerate_leg_is_never_published() {
        let (client, transport) = mock::client();
        transport.respond(
            r#"{"Legs": [
                {"Geometry": {"LineString": [[0, 0], [1, 1]]}, "Distance": 1.0, "DurationSeconds": 10},
                {"Geometry": {"LineString": [[1, 1]]}, "Distance": 0.0, "DurationSeconds": 0}
            ]}"#,
        );
        let mut project = MapProject::new();
        let result = RouteCalculator::default().add_to_map(
            &settings(),
            &client,
            Position::new(0.0, 0.0),
            Position::new(1.0, 1.0),
            &mut project,
        );
        assert!(matches!(result, Err(Error::SchemaViolation(_))));
        assert!(project.layers().is_empty());
    }

    #[test]
    fn transport_failure_publishes_nothing() {
        let (client, transport) = mock::client();
        transport.fail(Error::RequestError(
            reqwest::StatusCode::NOT_FOUND,
            "calculator not found".to_string(),
        ));
        let mut project = MapProject::new();
        let result = RouteCalculator::default().add_to_map(
            &settings(),
            &client,
            Position::new(0.0, 0.0),
            Position::new(1.0, 1.0),
            &mut project,
        );
        assert!(result.is_err());
        assert!(project.layers().is_empty());
    }
}
