use std::cmp::Ordering;

use crate::marketplace::{MarketplaceError, Product, Version};

/// The newest version of the product.
///
/// Versions are compared as semantic versions when every version number of
/// the product parses as one. A single unparsable number switches the whole
/// comparison to plain string ordering.
pub fn latest_version(product: &Product) -> Option<&Version> {
    let parsed: Option<Vec<semver::Version>> = product
        .all_versions
        .iter()
        .map(|version| semver::Version::parse(&version.number).ok())
        .collect();

    match parsed {
        Some(parsed) => product
            .all_versions
            .iter()
            .zip(parsed)
            .max_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(version, _)| version),
        None => {
            log::debug!(
                "{} has version numbers that are not semver, comparing them as strings",
                product.slug
            );
            product
                .all_versions
                .iter()
                .max_by(|a, b| a.number.cmp(&b.number))
        }
    }
}

/// Finds the requested version, or the latest one when `requested` is empty.
pub fn resolve_version(product: &Product, requested: &str) -> Result<Version, MarketplaceError> {
    if requested.is_empty() {
        return latest_version(product)
            .cloned()
            .ok_or_else(|| MarketplaceError::NoVersions {
                product: product.slug.clone(),
            });
    }

    product
        .all_versions
        .iter()
        .find(|version| version.number == requested)
        .cloned()
        .ok_or_else(|| MarketplaceError::VersionDoesNotExist {
            product: product.slug.clone(),
            version: requested.to_string(),
        })
}

/// Like [`resolve_version`], but hands out a pending new version when the
/// requested one is missing and `create` is set.
pub fn resolve_or_create_version(
    product: &Product,
    requested: &str,
    create: bool,
) -> Result<Version, MarketplaceError> {
    match resolve_version(product, requested) {
        Err(MarketplaceError::VersionDoesNotExist { version, .. }) if create => {
            log::debug!("Creating version {} of {}", version, product.slug);
            Ok(Version::new_pending(version))
        }
        result => result,
    }
}

/// Versions ordered newest first, using the same rules as [`latest_version`].
pub fn sorted_versions(product: &Product) -> Vec<Version> {
    let mut versions = product.all_versions.clone();
    let all_semver = versions
        .iter()
        .all(|version| semver::Version::parse(&version.number).is_ok());

    versions.sort_by(|a, b| compare(&b.number, &a.number, all_semver));
    versions
}

fn compare(a: &str, b: &str, as_semver: bool) -> Ordering {
    if as_semver {
        if let (Ok(a), Ok(b)) = (semver::Version::parse(a), semver::Version::parse(b)) {
            return a.cmp(&b);
        }
    }
    a.cmp(b)
}
