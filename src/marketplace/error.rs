use std::path::PathBuf;

use crate::assets::{Asset, AssetKind};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum MarketplaceError {
    #[error("product \"{slug}\" not found")]
    ProductNotFound { slug: String },

    #[error("product \"{product}\" does not have any versions")]
    NoVersions { product: String },

    #[error("product \"{product}\" does not have version {version}")]
    VersionDoesNotExist { product: String, version: String },

    #[error("cannot attach a {kind} to {slug} which is of type {solution_type}")]
    IncompatibleSolutionType {
        kind: AssetKind,
        slug: String,
        display_name: String,
        solution_type: String,
    },

    #[error("{slug} {version} already has the image {image}:{tag}")]
    DuplicateImage {
        slug: String,
        version: String,
        image: String,
        tag: String,
    },

    #[error("unsupported protocol scheme: {scheme}")]
    UnsupportedScheme { scheme: String },

    #[error("product {product} {version} does not have any downloadable {}assets", kind_prefix(.kind))]
    NoAssets {
        product: String,
        version: String,
        kind: Option<AssetKind>,
    },

    #[error("product {product} {version} has multiple downloadable {}assets, please use the --filter parameter", kind_prefix(.kind))]
    AmbiguousSelection {
        product: String,
        version: String,
        kind: Option<AssetKind>,
        candidates: Vec<Asset>,
    },

    #[error("product {product} {version} does not have any downloadable {}assets that match the filter \"{filter}\", please adjust the --filter parameter", kind_prefix(.kind))]
    NoMatch {
        product: String,
        version: String,
        kind: Option<AssetKind>,
        filter: String,
    },

    #[error("product {product} {version} has multiple downloadable {}assets that match the filter \"{filter}\", please adjust the --filter parameter", kind_prefix(.kind))]
    AmbiguousFilter {
        product: String,
        version: String,
        kind: Option<AssetKind>,
        filter: String,
        candidates: Vec<Asset>,
    },

    #[error("sending the request for product \"{product}\" failed")]
    Transport {
        product: String,
        #[source]
        source: BoxError,
    },

    #[error("you do not have permission to modify the product \"{product}\"")]
    PermissionDenied { product: String },

    #[error("updating product \"{product}\" failed: ({status})\n{body}")]
    UpdateFailed {
        product: String,
        status: u16,
        body: String,
    },

    #[error("failed to parse the response for product \"{product}\"")]
    ResponseParse {
        product: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request to {url} failed: ({status})\n{body}")]
    UnexpectedResponse {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to upload {}", .path.display())]
    UploadFailed {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("failed to download {url}")]
    DownloadFailed {
        url: String,
        #[source]
        source: BoxError,
    },

    #[error("{} is not a valid chart: {reason}", .path.display())]
    InvalidChart { path: PathBuf, reason: String },

    #[error("failed to access {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MarketplaceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// The candidates of a selection failure, if it carries any.
    pub fn candidates(&self) -> Option<&[Asset]> {
        match self {
            Self::AmbiguousSelection { candidates, .. }
            | Self::AmbiguousFilter { candidates, .. } => Some(candidates),
            _ => None,
        }
    }
}

fn kind_prefix(kind: &Option<AssetKind>) -> String {
    match kind {
        Some(kind) => format!("{} ", kind),
        None => String::new(),
    }
}
