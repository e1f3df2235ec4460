use std::fmt::Display;
use std::str::FromStr;

use serde::Serialize;

use crate::marketplace::{
    DownloadRequestPayload, MarketplaceError, Product, SolutionType, STATUS_INACTIVE,
};

const VM_SOLUTION_TYPES: &[SolutionType] = &[SolutionType::Ova, SolutionType::Iso];
const CHART_SOLUTION_TYPES: &[SolutionType] = &[SolutionType::Chart];
const IMAGE_SOLUTION_TYPES: &[SolutionType] = &[SolutionType::Image];
const OTHER_SOLUTION_TYPES: &[SolutionType] = &[SolutionType::Others];

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Vm,
    Chart,
    Image,
    MetaFile,
    Other,
}

impl AssetKind {
    pub const ALL: [AssetKind; 5] = [
        AssetKind::Vm,
        AssetKind::Chart,
        AssetKind::Image,
        AssetKind::MetaFile,
        AssetKind::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vm => "vm",
            Self::Chart => "chart",
            Self::Image => "image",
            Self::MetaFile => "metafile",
            Self::Other => "other",
        }
    }

    /// Solution types that accept this kind of attachment. `None` means any.
    pub fn compatible_solution_types(&self) -> Option<&'static [SolutionType]> {
        match self {
            Self::Vm => Some(VM_SOLUTION_TYPES),
            Self::Chart => Some(CHART_SOLUTION_TYPES),
            Self::Image => Some(IMAGE_SOLUTION_TYPES),
            Self::Other => Some(OTHER_SOLUTION_TYPES),
            Self::MetaFile => None,
        }
    }

    pub fn ensure_compatible(&self, product: &Product) -> Result<(), MarketplaceError> {
        match self.compatible_solution_types() {
            Some(allowed) if !allowed.contains(&product.solution_type) => {
                Err(MarketplaceError::IncompatibleSolutionType {
                    kind: *self,
                    slug: product.slug.clone(),
                    display_name: product.display_name.clone(),
                    solution_type: product.solution_type.to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| {
                format!(
                    "unknown asset type \"{}\", must be one of {}",
                    s,
                    Self::ALL.map(|kind| kind.as_str()).join(", ")
                )
            })
    }
}

/// A read-only view of one downloadable item of a product version.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Asset {
    pub display_name: String,
    pub filename: String,
    pub kind: AssetKind,
    pub version: String,
    pub size: i64,
    pub downloads: i64,
    pub downloadable: bool,
    #[serde(skip)]
    pub download_request: DownloadRequestPayload,
}

/// Lists the assets of a version in a fixed order: VM files, charts,
/// container image tags, metafile objects and other files.
pub fn assets_for_version(product: &Product, version: &str) -> Vec<Asset> {
    if !product.has_version(version) {
        log::debug!("{} has no version {}, no assets", product.slug, version);
        return Vec::new();
    }

    let payload = || DownloadRequestPayload::new(&product.id, version);
    let mut assets = Vec::new();

    for file in product
        .deployment_files
        .iter()
        .filter(|file| file.app_version == version)
    {
        assets.push(Asset {
            display_name: file.name.clone(),
            filename: file.name.clone(),
            kind: AssetKind::Vm,
            version: version.to_string(),
            size: file.total_size(),
            downloads: file.download_count,
            downloadable: file.status != STATUS_INACTIVE,
            download_request: DownloadRequestPayload {
                deployment_file_id: Some(file.file_id.clone()),
                ..payload()
            },
        });
    }

    for chart in product.charts_for_version(version) {
        let tar_url = if chart.helm_tar_url.is_empty() {
            &chart.tar_url
        } else {
            &chart.helm_tar_url
        };
        let filename = match tar_url.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("{}-{}.tgz", chart.repo.name, chart.version),
        };
        assets.push(Asset {
            display_name: chart.repo.name.clone(),
            filename,
            kind: AssetKind::Chart,
            version: version.to_string(),
            size: chart.size,
            downloads: chart.download_count,
            downloadable: chart.is_updated_in_marketplace_registry,
            download_request: DownloadRequestPayload {
                chart_version: Some(chart.version.clone()),
                ..payload()
            },
        });
    }

    for list in product
        .docker_link_versions
        .iter()
        .filter(|list| list.app_version == version)
    {
        for url in &list.docker_urls {
            let image_name = url.url.rsplit('/').next().unwrap_or(&url.url);
            for tag in &url.image_tags {
                assets.push(Asset {
                    display_name: format!("{}:{}", url.url, tag.tag),
                    filename: format!("{}-{}.tar", image_name, tag.tag),
                    kind: AssetKind::Image,
                    version: version.to_string(),
                    size: tag.size,
                    downloads: tag.download_count,
                    downloadable: tag.is_updated_in_marketplace_registry,
                    download_request: DownloadRequestPayload {
                        docker_link_version_id: Some(list.id.clone()),
                        docker_url_id: Some(url.id.clone()),
                        image_tag_id: Some(tag.id.clone()),
                        ..payload()
                    },
                });
            }
        }
    }

    for meta_file in product
        .meta_files
        .iter()
        .filter(|meta_file| meta_file.app_version == version)
    {
        for object in &meta_file.objects {
            assets.push(Asset {
                display_name: object.file_name.clone(),
                filename: object.file_name.clone(),
                kind: AssetKind::MetaFile,
                version: meta_file.version.clone(),
                size: object.size,
                downloads: object.download_count,
                downloadable: object.is_file_backed_up,
                download_request: DownloadRequestPayload {
                    meta_file_id: Some(meta_file.id.clone()),
                    meta_file_object_id: Some(object.file_id.clone()),
                    ..payload()
                },
            });
        }
    }

    for file in product
        .addon_files
        .iter()
        .filter(|file| file.app_version == version)
    {
        assets.push(Asset {
            display_name: file.name.clone(),
            filename: file.name.clone(),
            kind: AssetKind::Other,
            version: version.to_string(),
            size: file.size,
            downloads: file.download_count,
            downloadable: file.status != STATUS_INACTIVE,
            download_request: DownloadRequestPayload {
                is_addon_file: Some(true),
                addon_file_id: Some(file.id.clone()),
                ..payload()
            },
        });
    }

    assets
}

/// Picks exactly one downloadable asset, narrowing by kind and then by a
/// case-sensitive substring of the filename.
pub fn select_asset(
    product: &str,
    version: &str,
    assets: Vec<Asset>,
    kind: Option<AssetKind>,
    filter: Option<&str>,
) -> Result<Asset, MarketplaceError> {
    let mut candidates: Vec<Asset> = assets
        .into_iter()
        .filter(|asset| asset.downloadable)
        .filter(|asset| kind.map_or(true, |kind| asset.kind == kind))
        .collect();

    if candidates.is_empty() {
        return Err(MarketplaceError::NoAssets {
            product: product.to_string(),
            version: version.to_string(),
            kind,
        });
    }
    if candidates.len() == 1 {
        return Ok(candidates.remove(0));
    }

    let filter = match filter {
        Some(filter) => filter,
        None => {
            return Err(MarketplaceError::AmbiguousSelection {
                product: product.to_string(),
                version: version.to_string(),
                kind,
                candidates,
            })
        }
    };

    let mut matches: Vec<Asset> = candidates
        .into_iter()
        .filter(|asset| asset.filename.contains(filter))
        .collect();

    match matches.len() {
        0 => Err(MarketplaceError::NoMatch {
            product: product.to_string(),
            version: version.to_string(),
            kind,
            filter: filter.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        _ => Err(MarketplaceError::AmbiguousFilter {
            product: product.to_string(),
            version: version.to_string(),
            kind,
            filter: filter.to_string(),
            candidates: matches,
        }),
    }
}
