//! User editable service settings (region, API key and resource identifiers)
//!
//! Settings are loaded once from a [`SettingsStore`] when the application starts and kept in
//! memory afterwards. Every [`Settings::set`] call writes the whole set back to the store before
//! the cached value changes.
use crate::Error;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Name of the settings file stored under the data directory
static SETTINGS_FILE_NAME: &str = "settings.yml";

/// The fixed set of keys the application knows how to store
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SettingKey {
    #[serde(rename = "region_value")]
    Region,
    #[serde(rename = "apikey_value")]
    ApiKey,
    #[serde(rename = "map_value")]
    Map,
    #[serde(rename = "place_value")]
    Place,
    #[serde(rename = "routes_value")]
    Routes,
}

impl SettingKey {
    /// Every key in display order
    pub const ALL: [SettingKey; 5] = [
        SettingKey::Region,
        SettingKey::ApiKey,
        SettingKey::Map,
        SettingKey::Place,
        SettingKey::Routes,
    ];

    /// Name used to persist the value
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::Region => "region_value",
            SettingKey::ApiKey => "apikey_value",
            SettingKey::Map => "map_value",
            SettingKey::Place => "place_value",
            SettingKey::Routes => "routes_value",
        }
    }

    /// Human readable description of the key
    pub fn label(self) -> &'static str {
        match self {
            SettingKey::Region => "region",
            SettingKey::ApiKey => "API key",
            SettingKey::Map => "map name",
            SettingKey::Place => "place index name",
            SettingKey::Routes => "route calculator name",
        }
    }
}

impl FromStr for SettingKey {
    type Err = Error;

    /// Accepts both the stored name (`region_value`) and the short form (`region`)
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let name = src.trim().to_ascii_lowercase();
        SettingKey::ALL
            .iter()
            .copied()
            .find(|key| key.as_str() == name || key.as_str().trim_end_matches("_value") == name)
            .ok_or_else(|| {
                Error::InvalidConfigurationValue(format!(
                    "unknown setting '{}', expected one of: region, apikey, map, place, routes",
                    src
                ))
            })
    }
}

/// Persistent backing storage for the settings
pub trait SettingsStore {
    /// Read every stored value, a store that was never written returns an empty map
    fn load(&self) -> Result<BTreeMap<String, String>, Error>;

    /// Replace the stored values
    fn save(&mut self, values: &BTreeMap<String, String>) -> Result<(), Error>;
}

/// Keeps the settings in a YAML file
#[derive(Clone, Debug)]
pub struct YamlSettingsStore {
    path: PathBuf,
}

impl YamlSettingsStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        YamlSettingsStore { path: path.into() }
    }

    /// Store located in the user's data directory
    pub fn in_data_dir() -> Self {
        Self::new(crate::data_dir().join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for YamlSettingsStore {
    fn load(&self) -> Result<BTreeMap<String, String>, Error> {
        if !self.path.exists() {
            debug!("No settings file found at {:?}, using defaults", self.path);
            return Ok(BTreeMap::new());
        }
        let mut fp = File::open(&self.path)?;
        let values: Option<BTreeMap<String, String>> = serde_yaml::from_reader(&mut fp)?;
        Ok(values.unwrap_or_default())
    }

    fn save(&mut self, values: &BTreeMap<String, String>) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                create_dir_all(parent)?;
            }
        }
        let fp = File::create(&self.path)?;
        serde_yaml::to_writer(fp, values)?;
        debug!("Saved settings to {:?}", self.path);
        Ok(())
    }
}

/// Keeps the settings in memory only
#[derive(Clone, Debug, Default)]
pub struct MemorySettingsStore {
    values: BTreeMap<String, String>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: &[(SettingKey, &str)]) -> Self {
        MemorySettingsStore {
            values: values
                .iter()
                .map(|(k, v)| (k.as_str().to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Result<BTreeMap<String, String>, Error> {
        Ok(self.values.clone())
    }

    fn save(&mut self, values: &BTreeMap<String, String>) -> Result<(), Error> {
        self.values = values.clone();
        Ok(())
    }
}

/// In-memory copy of the settings along with the store they persist to
pub struct Settings {
    values: BTreeMap<SettingKey, String>,
    store: Box<dyn SettingsStore>,
}

impl Settings {
    /// Read all settings from the store, keys that are absent default to an empty string
    pub fn load(store: Box<dyn SettingsStore>) -> Result<Self, Error> {
        let stored = store.load()?;
        let values = SettingKey::ALL
            .iter()
            .map(|key| {
                let value = stored.get(key.as_str()).cloned().unwrap_or_default();
                (*key, value)
            })
            .collect();
        Ok(Settings { values, store })
    }

    /// Settings backed by an in-memory store
    pub fn in_memory(values: &[(SettingKey, &str)]) -> Self {
        let values = SettingKey::ALL
            .iter()
            .map(|key| {
                let value = values
                    .iter()
                    .find(|(k, _)| k == key)
                    .map(|(_, v)| v.to_string())
                    .unwrap_or_default();
                (*key, value)
            })
            .collect();
        Settings {
            values,
            store: Box::new(MemorySettingsStore::new()),
        }
    }

    /// Return the value for a key, or an empty string if it was never set
    pub fn get(&self, key: SettingKey) -> &str {
        self.values.get(&key).map(String::as_str).unwrap_or("")
    }

    /// Look up a value by its stored name, unknown names return an empty string
    pub fn get_by_name(&self, name: &str) -> &str {
        match SettingKey::from_str(name) {
            Ok(key) => self.get(key),
            Err(_) => "",
        }
    }

    /// Return a copy of every setting
    pub fn get_all(&self) -> BTreeMap<SettingKey, String> {
        self.values.clone()
    }

    /// Return the value for a key, failing when it is empty
    pub fn require(&self, key: SettingKey) -> Result<&str, Error> {
        let value = self.get(key);
        if value.trim().is_empty() {
            Err(Error::ConfigurationMissing(key))
        } else {
            Ok(value)
        }
    }

    /// Update a value and write the settings to the store immediately
    pub fn set(&mut self, key: SettingKey, value: &str) -> Result<(), Error> {
        let mut updated = self.values.clone();
        updated.insert(key, value.to_string());
        let serialized = updated
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.clone()))
            .collect();
        self.store.save(&serialized)?;
        self.values = updated;
        Ok(())
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print the API key
        let mut map = f.debug_map();
        for (key, value) in &self.values {
            if *key == SettingKey::ApiKey && !value.is_empty() {
                map.entry(&key.as_str(), &"********");
            } else {
                map.entry(&key.as_str(), value);
            }
        }
        map.finish()
    }
}
