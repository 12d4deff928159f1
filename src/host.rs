//! The map that published layers end up in
use crate::click::ViewCrs;
use crate::layer::{Field, GeometryKind, Labeling, Layer, LayerBuilder, Renderer};
use crate::Error;
use geojson::FeatureCollection;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Name of the manifest written into a project directory
pub static PROJECT_FILE_NAME: &str = "project.json";

/// Parameters of a tile data source string
static DATA_SOURCE_KEYS: &[&str] = &["styleUrl", "type", "url", "zmax", "zmin"];

/// Receives finished layers for display
pub trait MapHost {
    /// Take ownership of a fully built vector layer
    fn add_layer(&mut self, layer: Layer) -> Result<(), Error>;

    /// Register a tile layer, tiles are fetched by the host itself
    fn add_tile_layer(&mut self, source: TileLayerSource) -> Result<(), Error>;

    /// Coordinate system of the map view
    fn crs(&self) -> ViewCrs;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    /// Vector tiles rendered with a style descriptor
    Vector,
    /// Pre-rendered raster tiles
    Raster,
}

/// Describes a tile layer, the tile URL keeps its `{z}/{x}/{y}` placeholders
#[derive(Debug, Clone, PartialEq)]
pub struct TileLayerSource {
    pub name: String,
    pub kind: TileKind,
    pub style_url: Option<String>,
    pub tile_url: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

impl TileLayerSource {
    /// Data source string in the form desktop GIS tile providers accept
    pub fn data_source(&self) -> String {
        match &self.style_url {
            Some(style_url) => format!(
                "styleUrl={}&type=xyz&url={}&zmax={}&zmin={}",
                style_url, self.tile_url, self.max_zoom, self.min_zoom
            ),
            None => format!(
                "type=xyz&url={}&zmin={}&zmax={}",
                self.tile_url, self.min_zoom, self.max_zoom
            ),
        }
    }

    /// Parse a string written by [`TileLayerSource::data_source`]
    pub fn from_data_source(
        name: &str,
        kind: TileKind,
        data_source: &str,
    ) -> Result<Self, Error> {
        let mut params: Vec<(&str, String)> = Vec::new();
        for part in data_source.split('&') {
            match part.split_once('=') {
                Some((key, value)) if DATA_SOURCE_KEYS.contains(&key) => {
                    params.push((key, value.to_string()))
                }
                // an '&' that belongs to one of the URLs
                _ => match params.last_mut() {
                    Some((_, value)) => {
                        value.push('&');
                        value.push_str(part);
                    }
                    None => return Err(invalid_data_source(data_source)),
                },
            }
        }
        let param = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
        };
        let zoom = |key: &str| -> Result<u8, Error> {
            param(key)
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| invalid_data_source(data_source))
        };
        Ok(TileLayerSource {
            name: name.to_string(),
            kind,
            style_url: param("styleUrl"),
            tile_url: param("url").ok_or_else(|| invalid_data_source(data_source))?,
            min_zoom: zoom("zmin")?,
            max_zoom: zoom("zmax")?,
        })
    }
}

fn invalid_data_source(data_source: &str) -> Error {
    Error::InvalidConfigurationValue(format!("invalid tile data source: {}", data_source))
}

/// Contents of `project.json`, vector layer features live in their own GeoJSON files
#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    crs: ViewCrs,
    tile_layers: Vec<TileLayerEntry>,
    layers: Vec<LayerEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TileLayerEntry {
    name: String,
    kind: TileKind,
    data_source: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct LayerEntry {
    name: String,
    file: String,
    geometry_kind: GeometryKind,
    schema: Vec<Field>,
    renderer: Option<Renderer>,
    labeling: Option<Labeling>,
}

impl LayerEntry {
    /// Rebuild the layer from its GeoJSON file in `dir`
    fn load(self, dir: &Path) -> Result<Layer, Error> {
        let fp = BufReader::new(File::open(dir.join(&self.file))?);
        let collection: FeatureCollection = serde_json::from_reader(fp).map_err(Error::Decode)?;
        let mut builder = LayerBuilder::new(&self.name, self.geometry_kind, self.schema)
            .populate_geojson(collection)?;
        if let Some(renderer) = self.renderer {
            builder = builder.style(renderer)?;
        }
        if let Some(labeling) = self.labeling {
            builder = builder.label(labeling)?;
        }
        Ok(builder.build())
    }
}

/// In-memory map project that can be saved to and restored from a directory
#[derive(Debug, Clone, PartialEq)]
pub struct MapProject {
    crs: ViewCrs,
    tile_layers: Vec<TileLayerSource>,
    layers: Vec<Layer>,
}

impl Default for MapProject {
    fn default() -> Self {
        MapProject {
            crs: ViewCrs::WebMercator,
            tile_layers: Vec::new(),
            layers: Vec::new(),
        }
    }
}

impl MapProject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_crs(crs: ViewCrs) -> Self {
        MapProject {
            crs,
            ..Default::default()
        }
    }

    /// Load the project saved in a directory, or start a new one if there is none
    pub fn open_dir(dir: &Path) -> Result<Self, Error> {
        let manifest = dir.join(PROJECT_FILE_NAME);
        if !manifest.exists() {
            debug!("No project found in {:?}, starting a new one", dir);
            return Ok(Self::new());
        }
        let fp = BufReader::new(File::open(&manifest)?);
        let manifest: Manifest = serde_json::from_reader(fp).map_err(Error::Decode)?;

        let mut project = MapProject::with_crs(manifest.crs);
        for entry in manifest.tile_layers {
            project.tile_layers.push(TileLayerSource::from_data_source(
                &entry.name,
                entry.kind,
                &entry.data_source,
            )?);
        }
        for entry in manifest.layers {
            debug!("Loading layer '{}' from {}", entry.name, entry.file);
            project.layers.push(entry.load(dir)?);
        }
        Ok(project)
    }

    /// Write the manifest and one GeoJSON file per vector layer
    pub fn write_to_dir(&self, dir: &Path) -> Result<(), Error> {
        if !dir.exists() {
            create_dir_all(dir)?;
        }
        let mut layers = Vec::with_capacity(self.layers.len());
        for (index, layer) in self.layers.iter().enumerate() {
            let file = geojson_file_name(index, layer.name());
            let path = dir.join(&file);
            let writer = BufWriter::new(File::create(&path)?);
            serde_json::to_writer_pretty(writer, &layer.to_geojson()?)
                .map_err(|e| Error::Io(e.into()))?;
            debug!("Wrote layer '{}' to {:?}", layer.name(), path);
            layers.push(LayerEntry {
                name: layer.name().to_string(),
                file,
                geometry_kind: layer.geometry_kind(),
                schema: layer.schema().to_vec(),
                renderer: layer.renderer().cloned(),
                labeling: layer.labeling().cloned(),
            });
        }
        let manifest = Manifest {
            crs: self.crs,
            tile_layers: self
                .tile_layers
                .iter()
                .map(|source| TileLayerEntry {
                    name: source.name.clone(),
                    kind: source.kind,
                    data_source: source.data_source(),
                })
                .collect(),
            layers,
        };
        let writer = BufWriter::new(File::create(dir.join(PROJECT_FILE_NAME))?);
        serde_json::to_writer_pretty(writer, &manifest).map_err(|e| Error::Io(e.into()))?;
        info!("Saved map project to {:?}", dir);
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn tile_layers(&self) -> &[TileLayerSource] {
        &self.tile_layers
    }
}

impl MapHost for MapProject {
    fn add_layer(&mut self, layer: Layer) -> Result<(), Error> {
        info!(
            "Added {} layer '{}' with {} features",
            layer.geometry_kind(),
            layer.name(),
            layer.features().len()
        );
        self.layers.push(layer);
        Ok(())
    }

    fn add_tile_layer(&mut self, source: TileLayerSource) -> Result<(), Error> {
        info!("Added tile layer '{}'", source.name);
        self.tile_layers.push(source);
        Ok(())
    }

    fn crs(&self) -> ViewCrs {
        self.crs
    }
}

/// Build a file name for a layer that is safe on every platform
fn geojson_file_name(index: usize, name: &str) -> String {
    let name: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{:02}-{}.geojson", index, name)
}
