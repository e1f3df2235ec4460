use std::fs::File;
use std::io;
use std::path::Path;

use sha1::{Digest, Sha1};

use crate::marketplace::MarketplaceError;

/// Hex encoded SHA-1 digest of the file contents.
pub fn sha1_file(path: &Path) -> Result<String, MarketplaceError> {
    let mut file = File::open(path).map_err(|source| MarketplaceError::io(path, source))?;
    let mut hasher = Sha1::new();
    io::copy(&mut file, &mut hasher).map_err(|source| MarketplaceError::io(path, source))?;
    Ok(format!("{:x}", hasher.finalize()))
}
