//! Raster XYZ tiles for the predefined map styles
use super::{encode_segment, expand_base_url, key_query, TILE_TEMPLATE};
use crate::config::FromFeatureConfig;
use crate::host::{MapHost, TileKind, TileLayerSource};
use crate::settings::{SettingKey, Settings};
use crate::Error;
use log::info;
use std::fmt;
use std::str::FromStr;

/// Options for the `maps` feature section of the config file
#[derive(Clone, Debug, FromFeatureConfig)]
pub struct RasterMapsOptions {
    pub base_url: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl Default for RasterMapsOptions {
    fn default() -> Self {
        RasterMapsOptions {
            base_url: "https://als.dayjournal.dev".to_string(),
            min_zoom: 0,
            max_zoom: 18,
        }
    }
}

/// Styles offered by the raster tile endpoint
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapStyle {
    Standard,
    Monochrome,
    Hybrid,
    Satellite,
}

impl MapStyle {
    pub const ALL: [MapStyle; 4] = [
        MapStyle::Standard,
        MapStyle::Monochrome,
        MapStyle::Hybrid,
        MapStyle::Satellite,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MapStyle::Standard => "Standard",
            MapStyle::Monochrome => "Monochrome",
            MapStyle::Hybrid => "Hybrid",
            MapStyle::Satellite => "Satellite",
        }
    }
}

impl fmt::Display for MapStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MapStyle {
    type Err = Error;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let name = src.trim();
        MapStyle::ALL
            .iter()
            .copied()
            .find(|style| style.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                Error::InvalidConfigurationValue(format!(
                    "unknown map style '{}', expected Standard, Monochrome, Hybrid or Satellite",
                    src
                ))
            })
    }
}

/// Tile URL template for a style, `{z}/{x}/{y}` is left for the tile loader
pub fn tile_url(settings: &Settings, options: &RasterMapsOptions, style: MapStyle) -> String {
    format!(
        "{}/{}/{}/{}?{}",
        expand_base_url(&options.base_url, settings.get(SettingKey::Region)),
        encode_segment(settings.get(SettingKey::Region)),
        style.as_str(),
        TILE_TEMPLATE,
        key_query("APIkey", settings.get(SettingKey::ApiKey))
    )
}

/// Adds raster basemaps to a host
#[derive(Clone, Debug, Default)]
pub struct RasterMaps {
    options: RasterMapsOptions,
}

impl RasterMaps {
    pub fn new(options: RasterMapsOptions) -> Self {
        RasterMaps { options }
    }

    /// Describe the tile layer, it is named after the style
    pub fn tile_source(
        &self,
        settings: &Settings,
        style: MapStyle,
    ) -> Result<TileLayerSource, Error> {
        settings.require(SettingKey::Region)?;
        settings.require(SettingKey::ApiKey)?;
        Ok(TileLayerSource {
            name: style.to_string(),
            kind: TileKind::Raster,
            style_url: None,
            tile_url: tile_url(settings, &self.options, style),
            min_zoom: self.options.min_zoom,
            max_zoom: self.options.max_zoom,
        })
    }

    pub fn add_to_map<H: MapHost + ?Sized>(
        &self,
        settings: &Settings,
        style: MapStyle,
        host: &mut H,
    ) -> Result<(), Error> {
        let source = self.tile_source(settings, style)?;
        info!("Adding {} raster map", style);
        host.add_tile_layer(source)
    }
}
