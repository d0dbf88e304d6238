//! Discovery of the `.pricing/` project directory.
//!
//! The `.pricing/` directory holds `config.yaml` and, by default, the
//! definitions file. It is found by walking up from the working directory.

use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// The name of the pricing project directory.
const PRICING_DIR_NAME: &str = ".pricing";

/// The environment variable that overrides discovery.
const PRICING_DIR_ENV: &str = "PRICING_DIR";

/// Walk up the directory tree from `start` looking for a `.pricing/`
/// directory.
///
/// `PRICING_DIR` is checked first. Returns `None` when the filesystem root
/// is reached without a match.
pub fn find_pricing_dir(start: &Path) -> Option<PathBuf> {
    if let Ok(env_dir) = std::env::var(PRICING_DIR_ENV) {
        let env_path = PathBuf::from(env_dir);
        if env_path.is_dir() {
            return Some(env_path);
        }
    }

    let start = start.canonicalize().ok()?;
    start
        .ancestors()
        .map(|dir| dir.join(PRICING_DIR_NAME))
        .find(|candidate| candidate.is_dir())
}

/// Like [`find_pricing_dir`], but a missing directory is an error.
///
/// # Errors
///
/// Returns [`ConfigError::PricingDirNotFound`] if no `.pricing/` directory
/// is found.
pub fn find_pricing_dir_or_error(start: &Path) -> Result<PathBuf, ConfigError> {
    find_pricing_dir(start).ok_or(ConfigError::PricingDirNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_in_dir_and_child() {
        let dir = tempfile::tempdir().unwrap();
        let pricing = dir.path().join(".pricing");
        std::fs::create_dir(&pricing).unwrap();
        let child = dir.path().join("src").join("deep");
        std::fs::create_dir_all(&child).unwrap();

        let expected = pricing.canonicalize().unwrap();
        for start in [dir.path(), child.as_path()] {
            let found = find_pricing_dir(start).unwrap().canonicalize().unwrap();
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_missing_start_is_none() {
        assert!(find_pricing_dir(Path::new("/nonexistent/start")).is_none());
    }

    #[test]
    fn test_or_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".pricing")).unwrap();
        assert!(find_pricing_dir_or_error(dir.path()).is_ok());
    }
}
