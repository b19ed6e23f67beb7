use std::{num::NonZeroUsize, path::PathBuf};

use serde::Deserialize;
use url::Url;

use crate::export::DEFAULT_CHUNK_SIZE;

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Directory of previously fetched raw documents.
    pub cache_dir: PathBuf,
    /// Records per upload request.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    pub source: SourceConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the upstream reach-detail endpoint.
    pub base_url: Url,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    /// Admin URL of the hosted feature service.
    pub url: Url,
    pub token: Option<String>,
    pub layer_name: String,
    /// Index of the layer within the service.
    #[serde(default)]
    pub layer_id: u32,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE.get()
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be a positive integer".into());
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err("cache_dir must not be empty".into());
        }
        if self.service.layer_name.is_empty() {
            return Err("service.layer_name must not be empty".into());
        }
        Ok(())
    }

    pub fn chunk_size(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.chunk_size).unwrap_or(DEFAULT_CHUNK_SIZE)
    }
}
