use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use url::Url;

mod api;
mod client;
mod error;

pub use api::*;
pub use client::{save_to_file, MarketplaceClient};
pub use error::MarketplaceError;

/// The remote product catalog.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProductStore {
    async fn get_product(&self, slug: &str) -> Result<Product, MarketplaceError>;

    /// Lists one page of products, starting at page 1.
    async fn list_products(
        &self,
        search: Option<String>,
        page: u32,
    ) -> Result<Vec<Product>, MarketplaceError>;

    /// Replaces the product record. `is_version_update` tells the backend
    /// that the payload creates a version.
    async fn replace_product(
        &self,
        product: &Product,
        is_version_update: bool,
    ) -> Result<Product, MarketplaceError>;

    async fn download(
        &self,
        product: &Product,
        payload: &DownloadRequestPayload,
        destination: &Path,
    ) -> Result<(), MarketplaceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub url: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Uploader {
    async fn upload_file(&self, path: &Path) -> Result<UploadedFile, MarketplaceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartMetadata {
    pub name: String,
    pub version: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChartLoader {
    fn load(&self, path: &Path) -> Result<ChartMetadata, MarketplaceError>;

    /// Downloads a remote chart archive into `directory`, returning its path.
    async fn download(&self, url: &Url, directory: &Path) -> Result<PathBuf, MarketplaceError>;
}
