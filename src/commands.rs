use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::assets::{assets_for_version, select_asset, AssetKind};
use crate::attach::{
    attach_chart, attach_container_image, attach_meta_file, attach_other_file, attach_vm,
    set_pca_file, AttachRequest, ChartAttachment, ImageAttachment, MetaFileAttachment,
};
use crate::config::Config;
use crate::marketplace::{ChartLoader, MetaFileType, Product, ProductStore, TagType, Uploader};
use crate::output;
use crate::versions::{resolve_version, sorted_versions};

#[derive(Subcommand)]
pub enum ProductCommand {
    /// List products
    List {
        /// Only list products matching this text
        #[clap(long)]
        search: Option<String>,
    },

    /// Show a product
    Get {
        /// Product slug
        #[clap(long)]
        product: String,
    },

    /// List the versions of a product, newest first
    ListVersions {
        /// Product slug
        #[clap(long)]
        product: String,
    },

    /// List the assets attached to a product version
    ListAssets {
        /// Product slug
        #[clap(long)]
        product: String,

        /// Product version, defaults to the latest one
        #[clap(long)]
        product_version: Option<String>,

        /// Only list assets of this type (vm, chart, image, metafile, other)
        #[clap(long = "type")]
        asset_type: Option<AssetKind>,
    },

    /// Record a compliance artifact on a product version
    Set {
        /// Product slug
        #[clap(long)]
        product: String,

        /// Product version, defaults to the latest one
        #[clap(long)]
        product_version: Option<String>,

        /// Compliance artifact (PCA) to upload
        #[clap(long)]
        pca_file: PathBuf,
    },
}

#[derive(Args)]
pub struct AttachTarget {
    /// Product slug
    #[clap(long)]
    product: String,

    /// Product version, defaults to the latest one
    #[clap(long)]
    product_version: Option<String>,

    /// Create the product version if it does not exist
    #[clap(long)]
    create_version: bool,

    /// Compliance artifact (PCA) to upload alongside the asset
    #[clap(long)]
    pca_file: Option<PathBuf>,
}

impl From<AttachTarget> for AttachRequest {
    fn from(target: AttachTarget) -> Self {
        Self {
            product: target.product,
            version: target.product_version.unwrap_or_default(),
            create_version: target.create_version,
            pca_file: target.pca_file,
        }
    }
}

#[derive(Subcommand)]
pub enum AttachCommand {
    /// Attach a helm chart from a local path or an http(s) URL
    Chart {
        #[clap(flatten)]
        target: AttachTarget,

        /// Path or URL of the chart archive
        #[clap(long)]
        chart: String,

        /// Deployment instructions
        #[clap(long, default_value = "")]
        instructions: String,
    },

    /// Attach a public container image
    Image {
        #[clap(flatten)]
        target: AttachTarget,

        /// Image repository, e.g. registry.example.com/team/nginx
        #[clap(long)]
        image_repository: String,

        /// Image tag
        #[clap(long)]
        tag: String,

        /// Tag type (fixed or floating)
        #[clap(long, default_value = "fixed")]
        tag_type: TagType,

        /// Deployment instructions
        #[clap(long, default_value = "")]
        instructions: String,
    },

    /// Upload and attach a VM image (OVA or ISO)
    Vm {
        #[clap(flatten)]
        target: AttachTarget,

        /// Path of the VM image
        #[clap(long)]
        file: PathBuf,
    },

    /// Upload and attach another kind of file
    Other {
        #[clap(flatten)]
        target: AttachTarget,

        /// Path of the file
        #[clap(long)]
        file: PathBuf,
    },

    /// Upload and attach a metafile
    Metafile {
        #[clap(flatten)]
        target: AttachTarget,

        /// Path of the metafile
        #[clap(long)]
        metafile: PathBuf,

        /// Metafile type (cli, config or misc)
        #[clap(long)]
        metafile_type: MetaFileType,

        /// Version of the metafile itself
        #[clap(long)]
        metafile_version: String,
    },
}

#[derive(Args)]
pub struct DownloadArgs {
    /// Product slug
    #[clap(long)]
    product: String,

    /// Product version, defaults to the latest one
    #[clap(long)]
    product_version: Option<String>,

    /// Only consider assets of this type (vm, chart, image, metafile, other)
    #[clap(long = "type")]
    asset_type: Option<AssetKind>,

    /// Select the asset whose filename contains this text
    #[clap(long)]
    filter: Option<String>,

    /// Save the asset under this name instead of its own filename
    #[clap(long)]
    filename: Option<String>,

    /// Accept the product EULA
    #[clap(long)]
    accept_eula: bool,
}

pub async fn run_product(
    config: &Config,
    store: &impl ProductStore,
    uploader: &impl Uploader,
    command: ProductCommand,
) -> Result<()> {
    match command {
        ProductCommand::List { search } => {
            let products = list_all_products(store, search).await?;
            output::print_products(&products, config.output)
        }
        ProductCommand::Get { product } => {
            let product = store
                .get_product(&product)
                .await
                .context("Failed to get the product")?;
            output::print_product(&product, config.output)
        }
        ProductCommand::ListVersions { product } => {
            let product = store
                .get_product(&product)
                .await
                .context("Failed to get the product")?;
            output::print_versions(&sorted_versions(&product), config.output)
        }
        ProductCommand::ListAssets {
            product,
            product_version,
            asset_type,
        } => {
            let product = store
                .get_product(&product)
                .await
                .context("Failed to get the product")?;
            let version = resolve_version(&product, &product_version.unwrap_or_default())?;
            let assets: Vec<_> = assets_for_version(&product, &version.number)
                .into_iter()
                .filter(|asset| asset_type.map_or(true, |kind| asset.kind == kind))
                .collect();
            output::print_assets(&assets, config.output)
        }
        ProductCommand::Set {
            product,
            product_version,
            pca_file,
        } => {
            let updated = set_pca_file(
                store,
                uploader,
                &product,
                &product_version.unwrap_or_default(),
                &pca_file,
            )
            .await
            .context("Failed to set the compliance artifact")?;
            output::print_product(&updated, config.output)
        }
    }
}

/// Fetches every page of products, one page at a time.
pub async fn list_all_products(
    store: &impl ProductStore,
    search: Option<String>,
) -> Result<Vec<Product>> {
    let mut products = Vec::new();
    let mut page = 1;
    loop {
        let batch = store
            .list_products(search.clone(), page)
            .await
            .context("Failed to list products")?;

        if batch.is_empty() {
            break;
        }

        products.extend(batch);
        page += 1;
    }

    Ok(products)
}

pub async fn run_attach(
    config: &Config,
    store: &impl ProductStore,
    uploader: &impl Uploader,
    charts: &impl ChartLoader,
    command: AttachCommand,
) -> Result<()> {
    let updated = match command {
        AttachCommand::Chart {
            target,
            chart,
            instructions,
        } => {
            let attachment = ChartAttachment {
                source: chart,
                instructions,
            };
            attach_chart(store, uploader, charts, &target.into(), &attachment)
                .await
                .context("Failed to attach the chart")?
        }
        AttachCommand::Image {
            target,
            image_repository,
            tag,
            tag_type,
            instructions,
        } => {
            let attachment = ImageAttachment {
                image: image_repository,
                tag,
                tag_type,
                instructions,
            };
            attach_container_image(store, uploader, &target.into(), &attachment)
                .await
                .context("Failed to attach the container image")?
        }
        AttachCommand::Vm { target, file } => {
            attach_vm(store, uploader, &target.into(), &file)
                .await
                .context("Failed to attach the VM image")?
        }
        AttachCommand::Other { target, file } => {
            attach_other_file(store, uploader, &target.into(), &file)
                .await
                .context("Failed to attach the file")?
        }
        AttachCommand::Metafile {
            target,
            metafile,
            metafile_type,
            metafile_version,
        } => {
            let attachment = MetaFileAttachment {
                path: metafile,
                file_type: metafile_type,
                version: metafile_version,
            };
            attach_meta_file(store, uploader, &target.into(), &attachment)
                .await
                .context("Failed to attach the metafile")?
        }
    };

    output::print_product(&updated, config.output)
}

pub async fn run_download(
    config: &Config,
    store: &impl ProductStore,
    args: DownloadArgs,
) -> Result<PathBuf> {
    let product = store
        .get_product(&args.product)
        .await
        .context("Failed to get the product")?;
    let version = resolve_version(&product, &args.product_version.unwrap_or_default())?;

    let assets = assets_for_version(&product, &version.number);
    let asset = match select_asset(
        &product.slug,
        &version.number,
        assets,
        args.asset_type,
        args.filter.as_deref(),
    ) {
        Ok(asset) => asset,
        Err(error) => {
            if let Some(candidates) = error.candidates() {
                output::print_assets(candidates, config.output)?;
            }
            return Err(error.into());
        }
    };

    let mut payload = asset.download_request.clone();
    payload.eula_accepted = args.accept_eula;

    let destination = PathBuf::from(args.filename.unwrap_or(asset.filename));
    store
        .download(&product, &payload, &destination)
        .await
        .context(format!("Failed to download {}", asset.display_name))?;

    log::info!("Downloaded {}", destination.display());
    Ok(destination)
}
