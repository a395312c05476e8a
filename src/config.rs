use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{LightsError, Result};
use crate::feed::FeedConfig;
use crate::graph::GraphConfig;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightsConfig {
    pub feed: FeedConfig,
    pub graph: GraphConfig,
    pub seed: Option<u64>,
}

impl LightsConfig {
    pub fn from_json(raw: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| LightsError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&raw).map_err(|source| LightsError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.feed.validate()?;
        self.graph.validate()
    }
}
