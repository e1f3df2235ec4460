use anyhow::Result;
use serde::Serialize;

use crate::assets::Asset;
use crate::config::OutputFormat;
use crate::marketplace::{Product, Version};

fn print_structured<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<bool> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
        OutputFormat::Text => return Ok(false),
    }
    Ok(true)
}

pub fn print_product(product: &Product, format: OutputFormat) -> Result<()> {
    if print_structured(product, format)? {
        return Ok(());
    }

    println!("{} ({})", product.display_name, product.slug);
    println!("Type: {}", product.solution_type);
    if !product.current_version.is_empty() {
        println!("Current version: {}", product.current_version);
    }
    println!("Versions: {}", product.all_versions.len());
    Ok(())
}

pub fn print_products(products: &[Product], format: OutputFormat) -> Result<()> {
    if print_structured(products, format)? {
        return Ok(());
    }

    println!("{:<40} {:<40} {:<10}", "SLUG", "NAME", "TYPE");
    for product in products {
        println!(
            "{:<40} {:<40} {:<10}",
            product.slug, product.display_name, product.solution_type
        );
    }
    println!("Total count: {}", products.len());
    Ok(())
}

pub fn print_versions(versions: &[Version], format: OutputFormat) -> Result<()> {
    if print_structured(versions, format)? {
        return Ok(());
    }

    println!("{:<20} {:<10}", "NUMBER", "STATUS");
    for version in versions {
        println!("{:<20} {:<10}", version.number, version.status);
    }
    Ok(())
}

pub fn print_assets(assets: &[Asset], format: OutputFormat) -> Result<()> {
    if print_structured(assets, format)? {
        return Ok(());
    }

    println!(
        "{:<40} {:<10} {:<12} {:>12} {:>10} {:<12}",
        "NAME", "TYPE", "VERSION", "SIZE", "DOWNLOADS", "DOWNLOADABLE"
    );
    for asset in assets {
        println!(
            "{:<40} {:<10} {:<12} {:>12} {:>10} {:<12}",
            asset.display_name,
            asset.kind,
            asset.version,
            asset.size,
            asset.downloads,
            asset.downloadable
        );
    }
    println!("Total count: {}", assets.len());
    Ok(())
}
