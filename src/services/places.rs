//! Free text place search biased towards a position
use super::{
    expand_base_url, key_query, search_result_labeling, search_result_renderer, ApiClient,
};
use crate::config::FromFeatureConfig;
use crate::gps::Position;
use crate::host::MapHost;
use crate::layer::{Feature, Field, Geometry, GeometryKind, IntoFeature, Layer, LayerBuilder};
use crate::settings::{SettingKey, Settings};
use crate::Error;
use log::info;
use serde::{Deserialize, Serialize};

/// Every text search is published to a layer with this name
pub static LAYER_NAME: &str = "SearchText";

pub static FIELD_TITLE: &str = "Title";
pub static FIELD_REGION: &str = "Region";
pub static FIELD_LOCALITY: &str = "Locality";
pub static FIELD_LABEL: &str = "Label";

/// Options for the `places` feature section of the config file
#[derive(Clone, Debug, FromFeatureConfig)]
pub struct TextSearchOptions {
    pub base_url: String,
    pub language: Option<String>,
    pub max_results: u32,
}

impl Default for TextSearchOptions {
    fn default() -> Self {
        TextSearchOptions {
            base_url: "https://places.geo.{region}.amazonaws.com".to_string(),
            language: None,
            max_results: 10,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SearchTextRequest<'a> {
    language: Option<&'a str>,
    max_results: u32,
    query_text: &'a str,
    bias_position: Position,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchTextResponse {
    #[serde(default)]
    pub result_items: Vec<ResultItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultItem {
    #[serde(default)]
    pub title: Option<String>,
    pub position: Position,
    #[serde(default)]
    pub address: Option<Address>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Address {
    #[serde(default)]
    pub region: Option<NamedArea>,
    #[serde(default)]
    pub locality: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamedArea {
    #[serde(default)]
    pub name: Option<String>,
}

impl IntoFeature for ResultItem {
    fn into_feature(self) -> Result<Feature, Error> {
        let address = self.address.unwrap_or_default();
        let region = address.region.and_then(|r| r.name);
        Ok(Feature::new(
            Geometry::Point(self.position),
            vec![
                self.title.unwrap_or_default().into(),
                region.unwrap_or_default().into(),
                address.locality.unwrap_or_default().into(),
                address.label.unwrap_or_default().into(),
            ],
        ))
    }
}

/// URL of the text search endpoint
pub fn search_text_url(settings: &Settings, options: &TextSearchOptions) -> String {
    format!(
        "{}/v2/search-text?{}",
        expand_base_url(&options.base_url, settings.get(SettingKey::Region)),
        key_query("key", settings.get(SettingKey::ApiKey))
    )
}

/// Runs a text search and shows the results as points
#[derive(Clone, Debug, Default)]
pub struct TextSearch {
    options: TextSearchOptions,
}

impl TextSearch {
    pub fn new(options: TextSearchOptions) -> Self {
        TextSearch { options }
    }

    /// Send the search request, results are biased towards `position`
    pub fn search(
        &self,
        settings: &Settings,
        client: &ApiClient,
        text: &str,
        position: Position,
    ) -> Result<SearchTextResponse, Error> {
        settings.require(SettingKey::Region)?;
        settings.require(SettingKey::ApiKey)?;
        let request = SearchTextRequest {
            language: self.options.language.as_deref(),
            max_results: self.options.max_results,
            query_text: text,
            bias_position: position,
        };
        let response: SearchTextResponse =
            client.post_json(&search_text_url(settings, &self.options), &request)?;
        info!(
            "Text search for '{}' near {} returned {} results",
            text,
            position,
            response.result_items.len()
        );
        Ok(response)
    }

    pub fn layer(&self, response: SearchTextResponse) -> Result<Layer, Error> {
        Ok(self.layer_builder(response)?.build())
    }

    fn layer_builder(&self, response: SearchTextResponse) -> Result<LayerBuilder, Error> {
        let schema = vec![
            Field::string(FIELD_TITLE),
            Field::string(FIELD_REGION),
            Field::string(FIELD_LOCALITY),
            Field::string(FIELD_LABEL),
        ];
        LayerBuilder::new(LAYER_NAME, GeometryKind::Point, schema)
            .populate(response.result_items)?
            .style(search_result_renderer())?
            .label(search_result_labeling(FIELD_TITLE))
    }

    /// Search for `text` and publish the result layer
    pub fn add_to_map<H: MapHost + ?Sized>(
        &self,
        settings: &Settings,
        client: &ApiClient,
        text: &str,
        position: Position,
        host: &mut H,
    ) -> Result<(), Error> {
        let response = self.search(settings, client, text, position)?;
        self.layer_builder(response)?.publish(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MapProject;
    use crate::layer::AttributeValue;
    use crate::services::client::mock;
    use serde_json::json;

    fn settings() -> Settings {
        Settings::in_memory(&[
            (SettingKey::Region, "eu-central-1"),
            (SettingKey::ApiKey, "v1.public.key"),
        ])
    }

    fn text(value: &str) -> AttributeValue {
        AttributeValue::String(value.to_string())
    }

    #[test]
    fn url_has_region_and_key() {
        assert_eq!(
            search_text_url(&settings(), &TextSearchOptions::default()),
            "https://places.geo.eu-central-1.amazonaws.com/v2/search-text?key=v1.public.key"
        );
    }

    #[test]
    fn request_carries_query_and_bias() {
        let (client, transport) = mock::client();
        transport.respond(r#"{"ResultItems": []}"#);
        let options = TextSearchOptions {
            language: Some("de".to_string()),
            max_results: 3,
            ..Default::default()
        };
        TextSearch::new(options)
            .search(&settings(), &client, "Brandenburger Tor", Position::new(13.4, 52.5))
            .unwrap();
        assert_eq!(
            transport.requests()[0].body,
            Some(json!({
                "Language": "de",
                "MaxResults": 3,
                "QueryText": "Brandenburger Tor",
                "BiasPosition": [13.4, 52.5]
            }))
        );
    }

    #[test]
    fn results_are_flattened_into_attributes() {
        let (client, transport) = mock::client();
        transport.respond(
            r#"{"ResultItems": [
                {"Title": "Brandenburger Tor", "Position": [13.377, 52.516],
                 "Address": {"Label": "Pariser Platz, Berlin", "Locality": "Berlin",
                             "Region": {"Code": "BE", "Name": "Berlin"}}},
                {"Title": "Tor", "Position": [13.0, 52.0]}
            ]}"#,
        );
        let mut project = MapProject::new();
        TextSearch::default()
            .add_to_map(&settings(), &client, "tor", Position::new(13.4, 52.5), &mut project)
            .unwrap();

        let layer = &project.layers()[0];
        assert_eq!(layer.name(), LAYER_NAME);
        assert_eq!(layer.features().len(), 2);
        assert_eq!(layer.attribute(0, FIELD_REGION), Some(&text("Berlin")));
        assert_eq!(layer.attribute(0, FIELD_LABEL), Some(&text("Pariser Platz, Berlin")));
        assert_eq!(layer.attribute(1, FIELD_LOCALITY), Some(&text("")));
        assert_eq!(layer.labeling().unwrap().field, FIELD_TITLE);
    }

    #[test]
    fn missing_result_items_gives_empty_layer() {
        let (client, transport) = mock::client();
        transport.respond("{}");
        let search = TextSearch::default();
        let response = search
            .search(&settings(), &client, "nothing", Position::new(0.0, 0.0))
            .unwrap();
        assert!(search.layer(response).unwrap().features().is_empty());
    }

    #[test]
    fn item_without_position_is_rejected() {
        let (client, transport) = mock::client();
        transport.respond(r#"{"ResultItems": [{"Title": "nowhere"}]}"#);
        let result = TextSearch::default().search(&settings(), &client, "x", Position::new(0.0, 0.0));
        assert!(matches!(result, Err(Error::SchemaViolation(_))));
    }
}
