use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub fn snapledger_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".snapledger"))
}

pub fn ensure_snapledger_home() -> Result<PathBuf> {
    let dir = snapledger_home()?;
    ensure_dir(&dir)?;
    Ok(dir)
}

pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))
}

/// Where inbound images land when no download dir is configured.
pub fn default_download_dir() -> PathBuf {
    std::env::temp_dir().join("snapledger")
}

/// Fresh, collision-free path for one downloaded image.
pub fn image_path(dir: &Path, extension: &str) -> PathBuf {
    dir.join(format!("{}.{}", uuid::Uuid::new_v4(), extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_paths_are_unique() {
        let dir = Path::new("/tmp/x");
        let a = image_path(dir, "jpg");
        let b = image_path(dir, "jpg");
        assert_ne!(a, b);
        assert_eq!(a.parent(), Some(dir));
        assert_eq!(a.extension().and_then(|e| e.to_str()), Some("jpg"));
    }
}
