//! Store application configuration that gets read from disk
use crate::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_yaml::Value;
use simplelog::LevelFilter;
use std::collections::HashMap;
use std::io::prelude::*;
use std::path::PathBuf;
use std::str::FromStr;

pub use location_service_derive::FromFeatureConfig;

/// Name of the config file stored under the configuration directory
static CONFIG_FILE_NAME: &str = "config.yml";

/// Defines the allowed keys under the features map
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    /// Vector tile map
    Map,
    /// Raster tile map styles
    Maps,
    /// Place search around a position
    Place,
    /// Free text place search
    Places,
    /// Route calculation
    Routes,
}

/// Type alias for clarity
pub type FeatureParameters = HashMap<String, Value>;

/// Build an options struct from a feature section of the config file
pub trait FromFeatureConfig: Sized + Default {
    fn from_config(config: &FeatureConfig) -> Result<Self, Error>;
}

/// Parameters for a single feature of any type
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureConfig {
    parameters: FeatureParameters,
}

impl FeatureConfig {
    pub fn new(parameters: FeatureParameters) -> Self {
        FeatureConfig { parameters }
    }

    pub fn parameters(&self) -> impl Iterator<Item = &String> + '_ {
        self.parameters.keys()
    }

    pub fn get_parameter(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    pub fn get_parameter_as_string(&self, key: &str) -> Option<Result<String, Error>> {
        self.parameters.get(key).map(|value| {
            value
                .as_str()
                .map(|v| v.to_string())
                .ok_or_else(|| invalid_value(key, "a string", value))
        })
    }

    /// Like `get_parameter_as_string` but a YAML null becomes `None`
    pub fn get_parameter_as_optional_string(
        &self,
        key: &str,
    ) -> Option<Result<Option<String>, Error>> {
        self.parameters.get(key).map(|value| match value {
            Value::Null => Ok(None),
            Value::String(v) => Ok(Some(v.clone())),
            _ => Err(invalid_value(key, "a string or null", value)),
        })
    }

    pub fn get_parameter_as_i64(&self, key: &str) -> Option<Result<i64, Error>> {
        self.parameters.get(key).map(|value| {
            value
                .as_i64()
                .ok_or_else(|| invalid_value(key, "an integer", value))
        })
    }

    pub fn get_parameter_as_f64(&self, key: &str) -> Option<Result<f64, Error>> {
        self.parameters.get(key).map(|value| {
            value
                .as_f64()
                .ok_or_else(|| invalid_value(key, "a floating point value", value))
        })
    }

    pub fn get_parameter_as_bool(&self, key: &str) -> Option<Result<bool, Error>> {
        self.parameters.get(key).map(|value| {
            value
                .as_bool()
                .ok_or_else(|| invalid_value(key, "true or false", value))
        })
    }
}

fn invalid_value(key: &str, expected: &str, value: &Value) -> Error {
    Error::InvalidConfigurationValue(format!(
        "invalid value for {}, expected {}: {:?}",
        key, expected, value
    ))
}

/// Configuration struct that we can create from the config file used
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(
        deserialize_with = "deserialize_level_filter",
        serialize_with = "serialize_level_filter"
    )]
    log_level: LevelFilter,
    timeout_secs: Option<u64>,
    features: HashMap<FeatureType, FeatureConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_level: LevelFilter::Info,
            timeout_secs: None,
            features: HashMap::new(),
        }
    }
}

impl Config {
    pub fn load<T: Read>(source: &mut T) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_reader(source)
    }

    /// Default location of the config file
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join(crate::APP_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }

    pub fn feature_config(&self, feature: FeatureType) -> Option<&FeatureConfig> {
        self.features.get(&feature)
    }

    /// Build the options for a feature, falling back to the defaults if it isn't configured
    pub fn feature_options<T: FromFeatureConfig>(&self, feature: FeatureType) -> Result<T, Error> {
        match self.features.get(&feature) {
            Some(cfg) => T::from_config(cfg),
            None => Ok(T::default()),
        }
    }
}

fn deserialize_level_filter<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
where
    D: Deserializer<'de>,
{
    let buf = String::deserialize(deserializer)?;
    LevelFilter::from_str(&buf)
        .map_err(|_| serde::de::Error::custom(format!("invalid level value: {}", buf)))
}

fn serialize_level_filter<S>(level: &LevelFilter, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&level.to_string())
}
