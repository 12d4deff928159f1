//! Reverse geocoding: find places near a position with a place index
use super::{
    encode_segment, expand_base_url, key_query, search_result_labeling, search_result_renderer,
    ApiClient,
};
use crate::config::FromFeatureConfig;
use crate::gps::Position;
use crate::host::MapHost;
use crate::layer::{Feature, Field, Geometry, GeometryKind, IntoFeature, Layer, LayerBuilder};
use crate::settings::{SettingKey, Settings};
use crate::Error;
use log::info;
use serde::{Deserialize, Serialize};

pub static FIELD_LABEL: &str = "Label";
pub static FIELD_MUNICIPALITY: &str = "Municipality";
pub static FIELD_REGION: &str = "Region";
pub static FIELD_COUNTRY: &str = "Country";

/// Options for the `place` feature section of the config file
#[derive(Clone, Debug, FromFeatureConfig)]
pub struct PlaceSearchOptions {
    pub base_url: String,
    pub language: Option<String>,
    pub max_results: u32,
}

impl Default for PlaceSearchOptions {
    fn default() -> Self {
        PlaceSearchOptions {
            base_url: "https://places.geo.{region}.amazonaws.com".to_string(),
            language: None,
            max_results: 10,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SearchPositionRequest<'a> {
    language: Option<&'a str>,
    max_results: u32,
    position: Position,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchPositionResponse {
    pub results: Vec<SearchPositionResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchPositionResult {
    pub place: Place,
}

/// A place returned by the index, any text field may be absent
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Place {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub municipality: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    pub geometry: PlaceGeometry,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlaceGeometry {
    pub point: Position,
}

impl IntoFeature for SearchPositionResult {
    fn into_feature(self) -> Result<Feature, Error> {
        let place = self.place;
        Ok(Feature::new(
            Geometry::Point(place.geometry.point),
            vec![
                place.label.unwrap_or_default().into(),
                place.municipality.unwrap_or_default().into(),
                place.region.unwrap_or_default().into(),
                place.country.unwrap_or_default().into(),
            ],
        ))
    }
}

/// URL of the search-by-position endpoint of the configured place index
pub fn search_position_url(settings: &Settings, options: &PlaceSearchOptions) -> String {
    format!(
        "{}/places/v0/indexes/{}/search/position?{}",
        expand_base_url(&options.base_url, settings.get(SettingKey::Region)),
        encode_segment(settings.get(SettingKey::Place)),
        key_query("key", settings.get(SettingKey::ApiKey))
    )
}

/// Searches a place index around a position and shows the results as points
#[derive(Clone, Debug, Default)]
pub struct PlaceSearch {
    options: PlaceSearchOptions,
}

impl PlaceSearch {
    pub fn new(options: PlaceSearchOptions) -> Self {
        PlaceSearch { options }
    }

    /// Send the search request
    pub fn search(
        &self,
        settings: &Settings,
        client: &ApiClient,
        position: Position,
    ) -> Result<SearchPositionResponse, Error> {
        settings.require(SettingKey::Region)?;
        settings.require(SettingKey::Place)?;
        settings.require(SettingKey::ApiKey)?;
        let request = SearchPositionRequest {
            language: self.options.language.as_deref(),
            max_results: self.options.max_results,
            position,
        };
        let response: SearchPositionResponse =
            client.post_json(&search_position_url(settings, &self.options), &request)?;
        info!(
            "Place search at {} returned {} results",
            position,
            response.results.len()
        );
        Ok(response)
    }

    /// Build the point layer, named after the place index
    pub fn layer(
        &self,
        settings: &Settings,
        response: SearchPositionResponse,
    ) -> Result<Layer, Error> {
        Ok(self.layer_builder(settings, response)?.build())
    }

    fn layer_builder(
        &self,
        settings: &Settings,
        response: SearchPositionResponse,
    ) -> Result<LayerBuilder, Error> {
        let name = settings.require(SettingKey::Place)?;
        let schema = vec![
            Field::string(FIELD_LABEL),
            Field::string(FIELD_MUNICIPALITY),
            Field::string(FIELD_REGION),
            Field::string(FIELD_COUNTRY),
        ];
        LayerBuilder::new(name, GeometryKind::Point, schema)
            .populate(response.results)?
            .style(search_result_renderer())?
            .label(search_result_labeling(FIELD_LABEL))
    }

    /// Search around `position` and publish the result layer
    pub fn add_to_map<H: MapHost + ?Sized>(
        &self,
        settings: &Settings,
        client: &ApiClient,
        position: Position,
        host: &mut H,
    ) -> Result<(), Error> {
        let response = self.search(settings, client, position)?;
        self.layer_builder(settings, response)?.publish(host)
    }
}
