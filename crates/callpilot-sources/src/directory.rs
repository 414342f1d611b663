//! Provider directory backed by a `providers.json` file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use callpilot_core::capability::ProviderDirectory;
use callpilot_core::{Provider, Result, SwarmError};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ProvidersFile {
    #[serde(default)]
    providers: Vec<Provider>,
}

/// Reads `{"providers": [...]}` on every lookup, so edits to the file are
/// picked up without a restart.
#[derive(Debug, Clone)]
pub struct JsonProviderDirectory {
    path: PathBuf,
}

impl JsonProviderDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every provider in the file. Records without an `id` are given their
    /// `place_id`, or `provider-{index}` when that is missing too.
    pub async fn load(&self) -> Result<Vec<Provider>> {
        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SwarmError::Directory(format!("cannot read {}: {e}", self.path.display()))
        })?;
        let file: ProvidersFile = serde_json::from_str(&raw).map_err(|e| {
            SwarmError::Directory(format!("invalid provider file {}: {e}", self.path.display()))
        })?;

        let providers: Vec<Provider> = file
            .providers
            .into_iter()
            .enumerate()
            .map(|(index, mut provider)| {
                if provider.id.trim().is_empty() {
                    provider.id = provider
                        .place_id
                        .clone()
                        .filter(|id| !id.trim().is_empty())
                        .unwrap_or_else(|| format!("provider-{index}"));
                }
                provider
            })
            .collect();
        debug!(path = %self.path.display(), count = providers.len(), "providers loaded");
        Ok(providers)
    }
}

#[async_trait]
impl ProviderDirectory for JsonProviderDirectory {
    async fn list_providers(&self, service: &str, limit: Option<usize>) -> Result<Vec<Provider>> {
        let mut providers: Vec<Provider> = self
            .load()
            .await?
            .into_iter()
            .filter(|p| p.service == service)
            .collect();
        // A zero limit means no limit.
        if let Some(limit) = limit.filter(|l| *l > 0) {
            providers.truncate(limit);
        }
        Ok(providers)
    }
}
