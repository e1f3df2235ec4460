//! Attaching assets to product versions.
//!
//! Every attach call fetches the product, resolves the version (optionally
//! creating it), checks the product's solution type, builds the entry for the
//! asset kind and submits a whole-record update. Nothing is kept between
//! calls; a failure at any step drops the in-memory copy.

use std::path::{Path, PathBuf};

use url::Url;

use crate::assets::AssetKind;
use crate::hashing::sha1_file;
use crate::marketplace::{
    AddonFile, ChartLoader, ChartVersion, DockerImageTag, DockerUrlDetails, DockerVersionList,
    MarketplaceError, MetaFile, MetaFileObject, MetaFileType, PcaDetails, Product,
    ProductDeploymentFile, ProductStore, Repo, TagType, Uploader, Version, HASH_ALGO_SHA1,
};
use crate::versions::{resolve_or_create_version, resolve_version};

/// Which product and version to attach to.
#[derive(Debug, Clone, Default)]
pub struct AttachRequest {
    pub product: String,
    /// Empty means the latest version.
    pub version: String,
    pub create_version: bool,
    /// Compliance artifact to upload and record alongside the asset.
    pub pca_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ChartAttachment {
    /// A local path, a `file://` URL or an http(s) URL.
    pub source: String,
    pub instructions: String,
}

#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub image: String,
    pub tag: String,
    pub tag_type: TagType,
    pub instructions: String,
}

#[derive(Debug, Clone)]
pub struct MetaFileAttachment {
    pub path: PathBuf,
    pub file_type: MetaFileType,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChartSource {
    Local(PathBuf),
    Remote(Url),
}

fn parse_chart_source(source: &str) -> Result<ChartSource, MarketplaceError> {
    let url = match Url::parse(source) {
        Ok(url) => url,
        Err(_) => return Ok(ChartSource::Local(PathBuf::from(source))),
    };

    match url.scheme() {
        // Windows drive letters parse as one-letter schemes
        scheme if scheme.len() == 1 => Ok(ChartSource::Local(PathBuf::from(source))),
        "file" => url
            .to_file_path()
            .map(ChartSource::Local)
            .map_err(|_| MarketplaceError::InvalidChart {
                path: PathBuf::from(source),
                reason: "not a valid local file URL".to_string(),
            }),
        "http" | "https" => Ok(ChartSource::Remote(url)),
        scheme => Err(MarketplaceError::UnsupportedScheme {
            scheme: scheme.to_string(),
        }),
    }
}

async fn resolve(
    store: &impl ProductStore,
    request: &AttachRequest,
    kind: AssetKind,
) -> Result<(Product, Version), MarketplaceError> {
    let product = store.get_product(&request.product).await?;
    let version = resolve_or_create_version(&product, &request.version, request.create_version)?;
    kind.ensure_compatible(&product)?;

    log::debug!(
        "Attaching a {} to {} {}{}",
        kind,
        product.slug,
        version.number,
        if version.is_new_version { " (new version)" } else { "" },
    );
    Ok((product, version))
}

/// Starts the update payload, registering the version if it is new.
fn update_for(product: &Product, version: &Version) -> Product {
    let mut update = product.clone();
    if version.is_new_version {
        update.all_versions.push(version.clone());
    }
    update
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

async fn finish(
    store: &impl ProductStore,
    uploader: &impl Uploader,
    request: &AttachRequest,
    mut update: Product,
    version: &Version,
) -> Result<Product, MarketplaceError> {
    if let Some(pca_file) = &request.pca_file {
        attach_pca(uploader, &mut update, version, pca_file).await?;
    }
    submit(store, update, version.is_new_version).await
}

async fn attach_pca(
    uploader: &impl Uploader,
    update: &mut Product,
    version: &Version,
    path: &Path,
) -> Result<(), MarketplaceError> {
    let uploaded = uploader.upload_file(path).await?;
    update.pca_details = Some(PcaDetails {
        url: uploaded.url,
        version: version.number.clone(),
    });
    Ok(())
}

/// Normalizes the product and sends it as a replace-style update.
pub async fn submit(
    store: &impl ProductStore,
    mut product: Product,
    is_new_version: bool,
) -> Result<Product, MarketplaceError> {
    product.prep_for_update();
    store.replace_product(&product, is_new_version).await
}

/// Attaches a helm chart. The chart replaces any chart already attached.
pub async fn attach_chart(
    store: &impl ProductStore,
    uploader: &impl Uploader,
    charts: &impl ChartLoader,
    request: &AttachRequest,
    attachment: &ChartAttachment,
) -> Result<Product, MarketplaceError> {
    let (product, version) = resolve(store, request, AssetKind::Chart).await?;

    let chart = match parse_chart_source(&attachment.source)? {
        ChartSource::Local(path) => {
            let metadata = charts.load(&path)?;
            let uploaded = uploader.upload_file(&path).await?;
            ChartVersion {
                version: metadata.version,
                app_version: version.number.clone(),
                readme: attachment.instructions.clone(),
                repo: Repo {
                    name: metadata.name,
                    url: String::new(),
                },
                is_external_url: false,
                tar_url: uploaded.url.clone(),
                helm_tar_url: uploaded.url,
                ..Default::default()
            }
        }
        ChartSource::Remote(url) => {
            let directory = tempfile::tempdir()
                .map_err(|source| MarketplaceError::io(std::env::temp_dir(), source))?;
            let path = charts.download(&url, directory.path()).await?;
            let metadata = charts.load(&path)?;
            let repo_url = url.join(".").map(|url| url.to_string()).unwrap_or_default();
            ChartVersion {
                version: metadata.version,
                app_version: version.number.clone(),
                readme: attachment.instructions.clone(),
                repo: Repo {
                    name: metadata.name,
                    url: repo_url,
                },
                is_external_url: true,
                tar_url: url.to_string(),
                helm_tar_url: url.to_string(),
                ..Default::default()
            }
        }
    };

    let mut update = update_for(&product, &version);
    update.chart_versions = vec![chart];
    finish(store, uploader, request, update, &version).await
}

/// Attaches a public container image tag.
pub async fn attach_container_image(
    store: &impl ProductStore,
    uploader: &impl Uploader,
    request: &AttachRequest,
    attachment: &ImageAttachment,
) -> Result<Product, MarketplaceError> {
    let (product, version) = resolve(store, request, AssetKind::Image).await?;

    let mut images = product
        .container_images_for_version(&version.number)
        .cloned()
        .unwrap_or_else(|| DockerVersionList {
            app_version: version.number.clone(),
            deployment_instruction: attachment.instructions.clone(),
            ..Default::default()
        });

    if images.has_image_with_tag(&attachment.image, &attachment.tag) {
        return Err(MarketplaceError::DuplicateImage {
            slug: product.slug.clone(),
            version: version.number.clone(),
            image: attachment.image.clone(),
            tag: attachment.tag.clone(),
        });
    }

    let tag = DockerImageTag {
        tag: attachment.tag.clone(),
        tag_type: attachment.tag_type,
        ..Default::default()
    };
    match images
        .docker_urls
        .iter_mut()
        .find(|details| details.url == attachment.image)
    {
        Some(details) => details.image_tags.push(tag),
        None => images.docker_urls.push(DockerUrlDetails {
            url: attachment.image.clone(),
            image_tags: vec![tag],
            deployment_instruction: attachment.instructions.clone(),
            ..Default::default()
        }),
    }

    let mut update = update_for(&product, &version);
    update.docker_link_versions = vec![images];
    finish(store, uploader, request, update, &version).await
}

/// Uploads and attaches a VM image (OVA or ISO).
pub async fn attach_vm(
    store: &impl ProductStore,
    uploader: &impl Uploader,
    request: &AttachRequest,
    path: &Path,
) -> Result<Product, MarketplaceError> {
    let (product, version) = resolve(store, request, AssetKind::Vm).await?;

    let hash = sha1_file(path)?;
    let uploaded = uploader.upload_file(path).await?;
    let image_type = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_ascii_uppercase())
        .unwrap_or_default();

    let mut update = update_for(&product, &version);
    update.deployment_files = vec![ProductDeploymentFile {
        name: file_name(path),
        url: uploaded.url,
        image_type,
        hash_digest: hash,
        hash_algo: HASH_ALGO_SHA1.to_string(),
        app_version: version.number.clone(),
        ..Default::default()
    }];
    finish(store, uploader, request, update, &version).await
}

/// Uploads and attaches an "other" file.
pub async fn attach_other_file(
    store: &impl ProductStore,
    uploader: &impl Uploader,
    request: &AttachRequest,
    path: &Path,
) -> Result<Product, MarketplaceError> {
    let (product, version) = resolve(store, request, AssetKind::Other).await?;

    let hash = sha1_file(path)?;
    let uploaded = uploader.upload_file(path).await?;

    let mut update = update_for(&product, &version);
    update.addon_files = vec![AddonFile {
        name: file_name(path),
        url: uploaded.url,
        hash_digest: hash,
        hash_algo: HASH_ALGO_SHA1.to_string(),
        app_version: version.number.clone(),
        ..Default::default()
    }];
    finish(store, uploader, request, update, &version).await
}

/// Uploads and attaches a metafile holding a single object.
pub async fn attach_meta_file(
    store: &impl ProductStore,
    uploader: &impl Uploader,
    request: &AttachRequest,
    attachment: &MetaFileAttachment,
) -> Result<Product, MarketplaceError> {
    let (product, version) = resolve(store, request, AssetKind::MetaFile).await?;

    let hash = sha1_file(&attachment.path)?;
    let uploaded = uploader.upload_file(&attachment.path).await?;

    let mut update = update_for(&product, &version);
    update.meta_files = vec![MetaFile {
        id: String::new(),
        file_type: attachment.file_type,
        version: attachment.version.clone(),
        app_version: version.number.clone(),
        objects: vec![MetaFileObject {
            file_name: file_name(&attachment.path),
            temp_url: uploaded.url.clone(),
            url: uploaded.url,
            hash_digest: hash,
            hash_algo: HASH_ALGO_SHA1.to_string(),
            ..Default::default()
        }],
        status: String::new(),
    }];
    finish(store, uploader, request, update, &version).await
}

/// Uploads a compliance artifact and records it on an existing version.
pub async fn set_pca_file(
    store: &impl ProductStore,
    uploader: &impl Uploader,
    slug: &str,
    version: &str,
    path: &Path,
) -> Result<Product, MarketplaceError> {
    let product = store.get_product(slug).await?;
    let version = resolve_version(&product, version)?;

    let mut update = product;
    attach_pca(uploader, &mut update, &version, path).await?;
    submit(store, update, false).await
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::marketplace::{
        ChartMetadata, MockChartLoader, MockProductStore, MockUploader, SolutionType,
        UploadedFile,
    };

    fn product(solution_type: SolutionType, versions: &[&str]) -> Product {
        Product {
            id: "product-id".to_string(),
            slug: "my-product".to_string(),
            display_name: "My Product".to_string(),
            solution_type,
            all_versions: versions
                .iter()
                .map(|number| Version {
                    number: number.to_string(),
                    ..Default::default()
                })
                .collect(),
            compatibility_matrix: vec![serde_json::json!({"platform": "k8s"})],
            ..Default::default()
        }
    }

    fn store_returning(product: Product) -> MockProductStore {
        let mut store = MockProductStore::new();
        store
            .expect_get_product()
            .withf(|slug| slug == "my-product")
            .returning(move |_| Ok(product.clone()));
        store
    }

    fn request(version: &str) -> AttachRequest {
        AttachRequest {
            product: "my-product".to_string(),
            version: version.to_string(),
            ..Default::default()
        }
    }

    fn uploaded(name: &str) -> UploadedFile {
        UploadedFile {
            url: format!("https://uploads.example.com/{}", name),
        }
    }

    fn temp_file(name: &str, contents: &[u8]) -> (tempfile::TempDir, PathBuf) {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(contents)
            .unwrap();
        (directory, path)
    }

    #[test]
    fn test_parse_chart_source() {
        assert_eq!(
            parse_chart_source("charts/my-chart-0.1.0.tgz").unwrap(),
            ChartSource::Local(PathBuf::from("charts/my-chart-0.1.0.tgz"))
        );
        assert_eq!(
            parse_chart_source("/tmp/my-chart-0.1.0.tgz").unwrap(),
            ChartSource::Local(PathBuf::from("/tmp/my-chart-0.1.0.tgz"))
        );
        assert_eq!(
            parse_chart_source("file:///tmp/my-chart-0.1.0.tgz").unwrap(),
            ChartSource::Local(PathBuf::from("/tmp/my-chart-0.1.0.tgz"))
        );
        assert_eq!(
            parse_chart_source("file:///tmp/my%20chart-0.1.0.tgz").unwrap(),
            ChartSource::Local(PathBuf::from("/tmp/my chart-0.1.0.tgz"))
        );
        assert_eq!(
            parse_chart_source(r"C:\charts\my-chart-0.1.0.tgz").unwrap(),
            ChartSource::Local(PathBuf::from(r"C:\charts\my-chart-0.1.0.tgz"))
        );
        assert!(matches!(
            parse_chart_source("https://charts.example.com/my-chart-0.1.0.tgz").unwrap(),
            ChartSource::Remote(_)
        ));

        let error = parse_chart_source("ftp://charts.example.com/my-chart-0.1.0.tgz").unwrap_err();
        assert_eq!(error.to_string(), "unsupported protocol scheme: ftp");
    }

    #[tokio::test]
    async fn test_attach_local_chart_replaces_existing_chart() {
        let mut existing = product(SolutionType::Chart, &["1.0.0"]);
        existing.chart_versions = vec![ChartVersion {
            version: "0.0.9".to_string(),
            app_version: "1.0.0".to_string(),
            ..Default::default()
        }];

        let mut store = store_returning(existing);
        store
            .expect_replace_product()
            .withf(|product, is_version_update| {
                product.chart_versions.len() == 1
                    && product.chart_versions[0].version == "0.1.0"
                    && product.chart_versions[0].repo.name == "my-chart"
                    && product.chart_versions[0].tar_url
                        == "https://uploads.example.com/my-chart-0.1.0.tgz"
                    && !product.chart_versions[0].is_external_url
                    && product.compatibility_matrix.is_empty()
                    && !*is_version_update
            })
            .times(1)
            .returning(|product, _| Ok(product.clone()));

        let mut uploader = MockUploader::new();
        uploader
            .expect_upload_file()
            .withf(|path| path == Path::new("charts/my-chart-0.1.0.tgz"))
            .times(1)
            .returning(|_| Ok(uploaded("my-chart-0.1.0.tgz")));

        let mut charts = MockChartLoader::new();
        charts.expect_load().times(1).returning(|_| {
            Ok(ChartMetadata {
                name: "my-chart".to_string(),
                version: "0.1.0".to_string(),
            })
        });
        charts.expect_download().never();

        let attachment = ChartAttachment {
            source: "charts/my-chart-0.1.0.tgz".to_string(),
            instructions: "helm install it".to_string(),
        };
        let updated = attach_chart(&store, &uploader, &charts, &request("1.0.0"), &attachment)
            .await
            .unwrap();
        assert_eq!(updated.chart_versions.len(), 1);
        assert_eq!(updated.chart_versions[0].readme, "helm install it");
    }

    #[tokio::test]
    async fn test_attach_remote_chart() {
        let mut store = store_returning(product(SolutionType::Chart, &["1.0.0"]));
        store
            .expect_replace_product()
            .withf(|product, _| {
                let chart = &product.chart_versions[0];
                chart.is_external_url
                    && chart.tar_url == "https://charts.example.com/stable/my-chart-0.1.0.tgz"
                    && chart.repo.url == "https://charts.example.com/stable/"
            })
            .times(1)
            .returning(|product, _| Ok(product.clone()));

        let mut uploader = MockUploader::new();
        uploader.expect_upload_file().never();

        let mut charts = MockChartLoader::new();
        charts
            .expect_download()
            .times(1)
            .returning(|_, directory| Ok(directory.join("my-chart-0.1.0.tgz")));
        charts
            .expect_load()
            .withf(|path| path.ends_with("my-chart-0.1.0.tgz"))
            .times(1)
            .returning(|_| {
                Ok(ChartMetadata {
                    name: "my-chart".to_string(),
                    version: "0.1.0".to_string(),
                })
            });

        let attachment = ChartAttachment {
            source: "https://charts.example.com/stable/my-chart-0.1.0.tgz".to_string(),
            instructions: String::new(),
        };
        attach_chart(&store, &uploader, &charts, &request("1.0.0"), &attachment)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_attach_chart_with_real_archive() {
        let directory = tempfile::tempdir().unwrap();
        let path = crate::chart::tests::write_chart(directory.path(), "my-chart", "0.2.0");

        let mut store = store_returning(product(SolutionType::Chart, &["1.0.0"]));
        store
            .expect_replace_product()
            .withf(|product, _| product.chart_versions[0].version == "0.2.0")
            .times(1)
            .returning(|product, _| Ok(product.clone()));

        let mut uploader = MockUploader::new();
        uploader
            .expect_upload_file()
            .times(1)
            .returning(|_| Ok(uploaded("my-chart-0.2.0.tgz")));

        let attachment = ChartAttachment {
            source: path.to_string_lossy().to_string(),
            instructions: String::new(),
        };
        attach_chart(
            &store,
            &uploader,
            &crate::chart::HelmChartLoader::new(),
            &request("1.0.0"),
            &attachment,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_attach_chart_to_wrong_solution_type() {
        let mut store = store_returning(product(SolutionType::Others, &["1.0.0"]));
        store.expect_replace_product().never();
        let mut uploader = MockUploader::new();
        uploader.expect_upload_file().never();
        let mut charts = MockChartLoader::new();
        charts.expect_load().never();

        let attachment = ChartAttachment {
            source: "charts/my-chart-0.1.0.tgz".to_string(),
            instructions: String::new(),
        };
        let error = attach_chart(&store, &uploader, &charts, &request("1.0.0"), &attachment)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot attach a chart to my-product which is of type OTHERS"
        );
    }

    #[tokio::test]
    async fn test_attach_chart_with_unsupported_scheme() {
        let mut store = store_returning(product(SolutionType::Chart, &["1.0.0"]));
        store.expect_replace_product().never();
        let uploader = MockUploader::new();
        let charts = MockChartLoader::new();

        let attachment = ChartAttachment {
            source: "ftp://charts.example.com/my-chart-0.1.0.tgz".to_string(),
            instructions: String::new(),
        };
        let error = attach_chart(&store, &uploader, &charts, &request("1.0.0"), &attachment)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            MarketplaceError::UnsupportedScheme { ref scheme } if scheme == "ftp"
        ));
    }

    #[tokio::test]
    async fn test_attach_image() {
        let mut existing = product(SolutionType::Image, &["1.2.3"]);
        existing.docker_link_versions = vec![DockerVersionList {
            id: "list-id".to_string(),
            app_version: "1.2.3".to_string(),
            docker_urls: vec![DockerUrlDetails {
                url: "nginx".to_string(),
                image_tags: vec![DockerImageTag {
                    tag: "latest".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }];

        let mut store = store_returning(existing);
        store
            .expect_replace_product()
            .withf(|product, _| {
                let images = &product.docker_link_versions;
                images.len() == 1
                    && images[0].id == "list-id"
                    && images[0].docker_urls.len() == 2
                    && images[0].docker_urls[1].url == "redis"
                    && images[0].docker_urls[1].image_tags[0].tag_type == TagType::Floating
            })
            .times(1)
            .returning(|product, _| Ok(product.clone()));
        let uploader = MockUploader::new();

        let attachment = ImageAttachment {
            image: "redis".to_string(),
            tag: "7".to_string(),
            tag_type: TagType::Floating,
            instructions: "docker run redis".to_string(),
        };
        attach_container_image(&store, &uploader, &request("1.2.3"), &attachment)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_attach_new_tag_to_existing_image() {
        let mut existing = product(SolutionType::Image, &["1.2.3"]);
        existing.docker_link_versions = vec![DockerVersionList {
            app_version: "1.2.3".to_string(),
            docker_urls: vec![DockerUrlDetails {
                url: "nginx".to_string(),
                image_tags: vec![DockerImageTag {
                    tag: "latest".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }];

        let mut store = store_returning(existing);
        store
            .expect_replace_product()
            .withf(|product, _| {
                let urls = &product.docker_link_versions[0].docker_urls;
                urls.len() == 1 && urls[0].image_tags.len() == 2
            })
            .times(1)
            .returning(|product, _| Ok(product.clone()));
        let uploader = MockUploader::new();

        let attachment = ImageAttachment {
            image: "nginx".to_string(),
            tag: "1.21".to_string(),
            tag_type: TagType::Fixed,
            instructions: String::new(),
        };
        attach_container_image(&store, &uploader, &request("1.2.3"), &attachment)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_attach_duplicate_image() {
        let mut existing = product(SolutionType::Image, &["1.2.3"]);
        existing.docker_link_versions = vec![DockerVersionList {
            app_version: "1.2.3".to_string(),
            docker_urls: vec![DockerUrlDetails {
                url: "nginx".to_string(),
                image_tags: vec![DockerImageTag {
                    tag: "latest".to_string(),
                    ..Default::default()
                }],
                ..Default::default()
            }],
            ..Default::default()
        }];

        let mut store = store_returning(existing);
        store.expect_replace_product().never();
        let mut uploader = MockUploader::new();
        uploader.expect_upload_file().never();

        let attachment = ImageAttachment {
            image: "nginx".to_string(),
            tag: "latest".to_string(),
            tag_type: TagType::Fixed,
            instructions: String::new(),
        };
        let error = attach_container_image(&store, &uploader, &request("1.2.3"), &attachment)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "my-product 1.2.3 already has the image nginx:latest"
        );
    }

    #[tokio::test]
    async fn test_attach_vm() {
        let (_directory, path) = temp_file("appliance.ova", b"hello world");

        let mut store = store_returning(product(SolutionType::Ova, &["1.0.0"]));
        store
            .expect_replace_product()
            .withf(|product, _| {
                let file = &product.deployment_files[0];
                product.deployment_files.len() == 1
                    && file.name == "appliance.ova"
                    && file.image_type == "OVA"
                    && file.url == "https://uploads.example.com/appliance.ova"
                    && file.hash_digest == "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
                    && file.hash_algo == "SHA1"
                    && file.app_version == "1.0.0"
            })
            .times(1)
            .returning(|product, _| Ok(product.clone()));

        let mut uploader = MockUploader::new();
        uploader
            .expect_upload_file()
            .times(1)
            .returning(|_| Ok(uploaded("appliance.ova")));

        attach_vm(&store, &uploader, &request("1.0.0"), &path)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_attach_vm_to_wrong_solution_type() {
        let (_directory, path) = temp_file("appliance.ova", b"hello world");

        let mut store = store_returning(product(SolutionType::Others, &["1.0.0"]));
        store.expect_replace_product().never();
        let mut uploader = MockUploader::new();
        uploader.expect_upload_file().never();

        let error = attach_vm(&store, &uploader, &request("1.0.0"), &path)
            .await
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "cannot attach a vm to my-product which is of type OTHERS"
        );
    }

    #[tokio::test]
    async fn test_attach_to_new_version() {
        let (_directory, path) = temp_file("appliance.iso", b"hello world");

        let mut store = store_returning(product(SolutionType::Iso, &["1.0.0"]));
        store
            .expect_replace_product()
            .withf(|product, is_version_update| {
                let new_version = product
                    .all_versions
                    .iter()
                    .find(|version| version.number == "2.0.0");
                *is_version_update
                    && matches!(new_version, Some(version) if version.is_new_version)
                    && product.versions == product.all_versions
                    && product.deployment_files[0].app_version == "2.0.0"
            })
            .times(1)
            .returning(|product, _| Ok(product.clone()));

        let mut uploader = MockUploader::new();
        uploader
            .expect_upload_file()
            .times(1)
            .returning(|_| Ok(uploaded("appliance.iso")));

        let request = AttachRequest {
            create_version: true,
            ..request("2.0.0")
        };
        attach_vm(&store, &uploader, &request, &path).await.unwrap();
    }

    #[tokio::test]
    async fn test_attach_to_missing_version() {
        let (_directory, path) = temp_file("appliance.iso", b"hello world");

        let mut store = store_returning(product(SolutionType::Iso, &["1.0.0"]));
        store.expect_replace_product().never();
        let mut uploader = MockUploader::new();
        uploader.expect_upload_file().never();

        let error = attach_vm(&store, &uploader, &request("2.0.0"), &path)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            MarketplaceError::VersionDoesNotExist { ref version, .. } if version == "2.0.0"
        ));
    }

    #[tokio::test]
    async fn test_attach_other_file_with_pca() {
        let (_directory, path) = temp_file("notes.txt", b"hello world");

        let mut store = store_returning(product(SolutionType::Others, &["1.0.0"]));
        store
            .expect_replace_product()
            .withf(|product, _| {
                product.addon_files.len() == 1
                    && product.addon_files[0].name == "notes.txt"
                    && product.pca_details
                        == Some(PcaDetails {
                            url: "https://uploads.example.com/pca.pdf".to_string(),
                            version: "1.0.0".to_string(),
                        })
            })
            .times(1)
            .returning(|product, _| Ok(product.clone()));

        let mut uploader = MockUploader::new();
        uploader
            .expect_upload_file()
            .withf(|path| path.ends_with("notes.txt"))
            .times(1)
            .returning(|_| Ok(uploaded("notes.txt")));
        uploader
            .expect_upload_file()
            .withf(|path| path.ends_with("pca.pdf"))
            .times(1)
            .returning(|_| Ok(uploaded("pca.pdf")));

        let request = AttachRequest {
            pca_file: Some(PathBuf::from("/compliance/pca.pdf")),
            ..request("")
        };
        attach_other_file(&store, &uploader, &request, &path)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_attach_meta_file() {
        let (_directory, path) = temp_file("my-cli", b"hello world");

        // Metafiles fit every solution type
        let mut store = store_returning(product(SolutionType::Chart, &["1.0.0"]));
        store
            .expect_replace_product()
            .withf(|product, _| {
                let meta_file = &product.meta_files[0];
                meta_file.file_type == MetaFileType::Cli
                    && meta_file.version == "0.0.1"
                    && meta_file.app_version == "1.0.0"
                    && meta_file.objects[0].file_name == "my-cli"
                    && meta_file.objects[0].hash_digest
                        == "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
            })
            .times(1)
            .returning(|product, _| Ok(product.clone()));

        let mut uploader = MockUploader::new();
        uploader
            .expect_upload_file()
            .times(1)
            .returning(|_| Ok(uploaded("my-cli")));

        let attachment = MetaFileAttachment {
            path,
            file_type: MetaFileType::Cli,
            version: "0.0.1".to_string(),
        };
        attach_meta_file(&store, &uploader, &request("1.0.0"), &attachment)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_submission_errors_are_surfaced() {
        let (_directory, path) = temp_file("appliance.ova", b"hello world");

        let mut store = store_returning(product(SolutionType::Ova, &["1.0.0"]));
        store.expect_replace_product().times(1).returning(|_, _| {
            Err(MarketplaceError::PermissionDenied {
                product: "my-product".to_string(),
            })
        });
        let mut uploader = MockUploader::new();
        uploader
            .expect_upload_file()
            .times(1)
            .returning(|_| Ok(uploaded("appliance.ova")));

        let error = attach_vm(&store, &uploader, &request("1.0.0"), &path)
            .await
            .unwrap_err();
        assert!(matches!(error, MarketplaceError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_set_pca_file() {
        let mut store = store_returning(product(SolutionType::Ova, &["1.0.0", "1.1.0"]));
        store
            .expect_replace_product()
            .withf(|product, is_version_update| {
                !*is_version_update
                    && matches!(&product.pca_details, Some(pca) if pca.version == "1.1.0")
            })
            .times(1)
            .returning(|product, _| Ok(product.clone()));
        let mut uploader = MockUploader::new();
        uploader
            .expect_upload_file()
            .times(1)
            .returning(|_| Ok(uploaded("pca.pdf")));

        set_pca_file(&store, &uploader, "my-product", "", Path::new("pca.pdf"))
            .await
            .unwrap();
    }
}
