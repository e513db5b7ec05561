use std::path::{Path, PathBuf};
use anyhow::{Context, Result};

/// Stylesheet installed into the media directory on first note type creation
pub const BUNDLED_ASSETS: &[(&str, &str)] = &[(
    "_dict2deck.css",
    include_str!("../../assets/_dict2deck.css"),
)];

/// The collection media directory
#[derive(Debug, Clone)]
pub struct MediaDir {
    path: PathBuf,
}

impl MediaDir {
    /// Open the media directory, creating it if needed
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create media directory: {}", path.display()))?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.path.join(filename).exists()
    }

    /// Write a file into the media directory
    pub fn add_file(&self, filename: &str, data: &[u8]) -> Result<PathBuf> {
        let target = self.path.join(filename);
        std::fs::write(&target, data)
            .with_context(|| format!("Failed to write media file: {}", target.display()))?;
        Ok(target)
    }

    /// Copy the bundled assets into the media directory
    pub fn install_bundled_assets(&self) -> Result<usize> {
        for (name, content) in BUNDLED_ASSETS {
            self.add_file(name, content.as_bytes())?;
            log::info!("Installed media asset {}", name);
        }
        Ok(BUNDLED_ASSETS.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let media = MediaDir::open(temp_dir.path().join("media")).unwrap();
        assert!(media.path().is_dir());
    }

    #[test]
    fn test_add_file_and_contains() {
        let temp_dir = TempDir::new().unwrap();
        let media = MediaDir::open(temp_dir.path()).unwrap();
        assert!(!media.contains("a.wav"));
        media.add_file("a.wav", b"RIFF").unwrap();
        assert!(media.contains("a.wav"));
    }

    #[test]
    fn test_install_bundled_assets() {
        let temp_dir = TempDir::new().unwrap();
        let media = MediaDir::open(temp_dir.path()).unwrap();
        assert_eq!(media.install_bundled_assets().unwrap(), BUNDLED_ASSETS.len());
        assert!(media.contains("_dict2deck.css"));
    }
}
