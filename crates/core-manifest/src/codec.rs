//! Pluggable manifest codecs
//!
//! Each codec is keyed by a format name and a file extension. The default
//! manifest file is `manifest.<extension>` inside the target directory.

use crate::error::{Error, Result};
use crate::record::ManifestRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Encode and decode a list of manifest records
pub trait ManifestCodec {
    /// Declared format name (`json`, `toml`)
    fn name(&self) -> &'static str;

    /// File extension used for the default manifest file name
    fn extension(&self) -> &'static str;

    /// Parse manifest text into records
    fn parse(&self, text: &str) -> Result<Vec<ManifestRecord>>;

    /// Serialize records into manifest text
    fn serialize(&self, records: &[ManifestRecord]) -> Result<String>;
}

/// JSON manifest: a pretty-printed array of records
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ManifestCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn parse(&self, text: &str) -> Result<Vec<ManifestRecord>> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(text)?)
    }

    fn serialize(&self, records: &[ManifestRecord]) -> Result<String> {
        let mut text = serde_json::to_string_pretty(records)?;
        text.push('\n');
        Ok(text)
    }
}

/// TOML manifest: an `[[asset]]` array of tables
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

#[derive(Serialize, Deserialize)]
struct TomlDocument {
    #[serde(default, rename = "asset")]
    assets: Vec<ManifestRecord>,
}

impl ManifestCodec for TomlCodec {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn extension(&self) -> &'static str {
        "toml"
    }

    fn parse(&self, text: &str) -> Result<Vec<ManifestRecord>> {
        let document: TomlDocument = toml::from_str(text)?;
        Ok(document.assets)
    }

    fn serialize(&self, records: &[ManifestRecord]) -> Result<String> {
        let document = TomlDocument {
            assets: records.to_vec(),
        };
        Ok(toml::to_string_pretty(&document)?)
    }
}

/// Registered manifest formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ManifestFormat {
    #[default]
    Json,
    Toml,
}

impl ManifestFormat {
    /// All registered formats
    pub const ALL: [ManifestFormat; 2] = [ManifestFormat::Json, ManifestFormat::Toml];

    /// Codec implementing this format
    pub fn codec(&self) -> Box<dyn ManifestCodec> {
        match self {
            ManifestFormat::Json => Box::new(JsonCodec),
            ManifestFormat::Toml => Box::new(TomlCodec),
        }
    }

    /// Format name
    pub fn name(&self) -> &'static str {
        self.codec().name()
    }

    /// Manifest file extension
    pub fn extension(&self) -> &'static str {
        self.codec().extension()
    }

    /// Default manifest file name (`manifest.json`, `manifest.toml`)
    pub fn default_file_name(&self) -> String {
        format!("manifest.{}", self.extension())
    }

    /// Look a format up by file extension
    pub fn from_extension(extension: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(extension))
    }
}

impl FromStr for ManifestFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|format| format.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownFormat(s.to_string()))
    }
}

impl fmt::Display for ManifestFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
