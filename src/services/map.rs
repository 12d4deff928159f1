//! Vector tile basemap served by an Amazon Location map resource
use super::{encode_segment, expand_base_url, key_query, ApiClient, TILE_TEMPLATE};
use crate::config::FromFeatureConfig;
use crate::host::{MapHost, TileKind, TileLayerSource};
use crate::settings::{SettingKey, Settings};
use crate::Error;
use log::{debug, info};
use serde::Deserialize;

/// Options for the `map` feature section of the config file
#[derive(Clone, Debug, FromFeatureConfig)]
pub struct MapOptions {
    pub base_url: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Default for MapOptions {
    fn default() -> Self {
        MapOptions {
            base_url: "https://maps.geo.{region}.amazonaws.com".to_string(),
            min_zoom: 0,
            max_zoom: 14,
        }
    }
}

/// The parts of a style descriptor we check when verifying it
#[derive(Debug, Deserialize)]
struct StyleDescriptor {
    version: u32,
    #[serde(default)]
    sources: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    layers: Vec<serde_json::Value>,
}

fn map_base(settings: &Settings, options: &MapOptions) -> String {
    format!(
        "{}/maps/v0/maps/{}",
        expand_base_url(&options.base_url, settings.get(SettingKey::Region)),
        encode_segment(settings.get(SettingKey::Map))
    )
}

/// URL of the style descriptor for the configured map
pub fn style_descriptor_url(settings: &Settings, options: &MapOptions) -> String {
    format!(
        "{}/style-descriptor?{}",
        map_base(settings, options),
        key_query("key", settings.get(SettingKey::ApiKey))
    )
}

/// Tile URL template for the configured map, `{z}/{x}/{y}` is left for the tile loader
pub fn tile_url(settings: &Settings, options: &MapOptions) -> String {
    format!(
        "{}/tiles/{}?{}",
        map_base(settings, options),
        TILE_TEMPLATE,
        key_query("key", settings.get(SettingKey::ApiKey))
    )
}

/// Adds the configured vector map to a host
#[derive(Clone, Debug, Default)]
pub struct MapTiles {
    options: MapOptions,
}

impl MapTiles {
    pub fn new(options: MapOptions) -> Self {
        MapTiles { options }
    }

    /// Describe the tile layer, the map is named after its resource
    pub fn tile_source(&self, settings: &Settings) -> Result<TileLayerSource, Error> {
        require_settings(settings)?;
        Ok(TileLayerSource {
            name: settings.get(SettingKey::Map).to_string(),
            kind: TileKind::Vector,
            style_url: Some(style_descriptor_url(settings, &self.options)),
            tile_url: tile_url(settings, &self.options),
            min_zoom: self.options.min_zoom,
            max_zoom: self.options.max_zoom,
        })
    }

    /// Fetch the style descriptor once to make sure the map resource and key are usable
    pub fn verify_style(&self, settings: &Settings, client: &ApiClient) -> Result<(), Error> {
        require_settings(settings)?;
        let style: StyleDescriptor =
            client.get_json(&style_descriptor_url(settings, &self.options))?;
        debug!(
            "Style descriptor version {} with {} sources and {} layers",
            style.version,
            style.sources.len(),
            style.layers.len()
        );
        if style.layers.is_empty() {
            return Err(Error::SchemaViolation(
                "style descriptor doesn't define any layers".to_string(),
            ));
        }
        Ok(())
    }

    /// Publish the tile layer to the host
    pub fn add_to_map<H: MapHost + ?Sized>(
        &self,
        settings: &Settings,
        host: &mut H,
    ) -> Result<(), Error> {
        let source = self.tile_source(settings)?;
        info!("Adding vector map '{}'", source.name);
        host.add_tile_layer(source)
    }
}

fn require_settings(settings: &Settings) -> Result<(), Error> {
    settings.require(SettingKey::Region)?;
    settings.require(SettingKey::Map)?;
    settings.require(SettingKey::ApiKey)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MapProject;
    use crate::services::client::mock;

    fn settings() -> Settings {
        Settings::in_memory(&[
            (SettingKey::Region, "us-west-2"),
            (SettingKey::Map, "explore.map"),
            (SettingKey::ApiKey, "v1.public/key=="),
        ])
    }

    #[test]
    fn urls_contain_region_map_and_encoded_key() {
        let opts = MapOptions::default();
        assert_eq!(
            style_descriptor_url(&settings(), &opts),
            "https://maps.geo.us-west-2.amazonaws.com/maps/v0/maps/explore.map/style-descriptor?key=v1.public%2Fkey%3D%3D"
        );
        assert_eq!(
            tile_url(&settings(), &opts),
            "https://maps.geo.us-west-2.amazonaws.com/maps/v0/maps/explore.map/tiles/{z}/{x}/{y}?key=v1.public%2Fkey%3D%3D"
        );
    }

    #[test]
    fn url_building_is_idempotent() {
        let opts = MapOptions::default();
        let s = settings();
        assert_eq!(tile_url(&s, &opts), tile_url(&s, &opts));
    }

    #[test]
    fn tile_source_uses_zoom_range() {
        let source = MapTiles::default().tile_source(&settings()).unwrap();
        assert_eq!(source.name, "explore.map");
        assert_eq!(source.kind, TileKind::Vector);
        assert!(source.data_source().ends_with("&zmax=14&zmin=0"));
    }

    #[test]
    fn missing_map_name_is_reported() {
        let settings = Settings::in_memory(&[
            (SettingKey::Region, "us-west-2"),
            (SettingKey::ApiKey, "k"),
        ]);
        let mut project = MapProject::new();
        match MapTiles::default().add_to_map(&settings, &mut project) {
            Err(Error::ConfigurationMissing(SettingKey::Map)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(project.tile_layers().is_empty());
    }

    #[test]
    fn verify_fetches_style_descriptor() {
        let (client, transport) = mock::client();
        transport.respond(r#"{"version": 8, "sources": {"esri": {}}, "layers": [{"id": "bg"}]}"#);
        MapTiles::default()
            .verify_style(&settings(), &client)
            .unwrap();
        let requests = transport.requests();
        assert_eq!(requests[0].method, "GET");
        assert!(requests[0].url.contains("/style-descriptor?key="));
    }

    #[test]
    fn verify_rejects_style_without_layers() {
        let (client, transport) = mock::client();
        transport.respond(r#"{"version": 8}"#);
        assert!(matches!(
            MapTiles::default().verify_style(&settings(), &client),
            Err(Error::SchemaViolation(_))
        ));
    }
}
