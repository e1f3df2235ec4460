use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use flate2::read::GzDecoder;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::marketplace::{save_to_file, ChartLoader, ChartMetadata, MarketplaceError};

const CHART_FILE: &str = "Chart.yaml";

#[derive(Deserialize)]
struct ChartFile {
    name: String,
    version: String,
}

/// Reads helm chart archives (`.tgz`) from disk or over http(s).
pub struct HelmChartLoader {
    client: Client,
}

impl HelmChartLoader {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

impl Default for HelmChartLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChartLoader for HelmChartLoader {
    fn load(&self, path: &Path) -> Result<ChartMetadata, MarketplaceError> {
        let invalid = |reason: String| MarketplaceError::InvalidChart {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|source| MarketplaceError::io(path, source))?;
        let mut archive = tar::Archive::new(GzDecoder::new(file));
        let entries = archive
            .entries()
            .map_err(|error| invalid(error.to_string()))?;

        for entry in entries {
            let mut entry = entry.map_err(|error| invalid(error.to_string()))?;
            let entry_path = entry
                .path()
                .map_err(|error| invalid(error.to_string()))?
                .into_owned();

            // Only the top level chart, not its bundled dependencies
            if entry_path.components().count() != 2 || !entry_path.ends_with(CHART_FILE) {
                continue;
            }

            let mut contents = String::new();
            entry
                .read_to_string(&mut contents)
                .map_err(|error| invalid(error.to_string()))?;
            let chart: ChartFile = serde_yaml::from_str(&contents)
                .map_err(|error| invalid(format!("failed to parse {}: {}", CHART_FILE, error)))?;

            log::debug!("Loaded chart {} {}", chart.name, chart.version);
            return Ok(ChartMetadata {
                name: chart.name,
                version: chart.version,
            });
        }

        Err(invalid(format!("no {} found", CHART_FILE)))
    }

    async fn download(&self, url: &Url, directory: &Path) -> Result<PathBuf, MarketplaceError> {
        let file_name = url
            .path_segments()
            .and_then(|segments| segments.last())
            .filter(|name| !name.is_empty())
            .unwrap_or("chart.tgz");
        let destination = directory.join(file_name);
        let download_failed = |source: reqwest::Error| MarketplaceError::DownloadFailed {
            url: url.to_string(),
            source: source.into(),
        };

        log::info!("Downloading chart from {}", url);
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(download_failed)?;

        save_to_file(response, url.as_str(), &destination).await?;
        Ok(destination)
    }
}
