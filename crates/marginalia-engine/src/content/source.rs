use crate::content::Collection;
use relative_path::{RelativePath, RelativePathBuf};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("content not found: {0}")]
    NotFound(RelativePathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: RelativePathBuf,
        source: std::io::Error,
    },
    #[error("invalid content directory: {0}")]
    InvalidContentDir(String),
}

/// Seam to the content store. Production reads a directory tree on disk;
/// tests substitute an in-memory map.
pub trait ContentSource {
    /// Fetch the raw text stored at `path`.
    fn fetch(&self, path: &RelativePath) -> Result<String, FetchError>;

    /// Keys available in a collection's primary-locale set. The primary set
    /// is authoritative; translations are partial by construction.
    fn list_keys(&self, collection: Collection) -> Vec<String>;
}

/// Content store rooted at a directory on disk.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ContentSource for DirSource {
    fn fetch(&self, path: &RelativePath) -> Result<String, FetchError> {
        let absolute = path.to_path(&self.root);
        if !absolute.exists() {
            return Err(FetchError::NotFound(path.to_relative_path_buf()));
        }
        fs::read_to_string(&absolute).map_err(|source| FetchError::Io {
            path: path.to_relative_path_buf(),
            source,
        })
    }

    fn list_keys(&self, collection: Collection) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.root.join(collection.dir())) else {
            return Vec::new();
        };

        let mut keys: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.is_file()
                    && let Some(ext) = path.extension()
                    && ext == "md"
                {
                    path.file_stem().map(|s| s.to_string_lossy().into_owned())
                } else {
                    None
                }
            })
            .collect();
        keys.sort();
        keys
    }
}

/// Check that a path looks like a content root before starting a frontend.
pub fn validate_content_dir(path: &Path) -> Result<(), FetchError> {
    if !path.exists() || !path.is_dir() {
        return Err(FetchError::InvalidContentDir(
            "directory does not exist".to_string(),
        ));
    }
    if !path.join(Collection::Chapters.dir()).is_dir() {
        return Err(FetchError::InvalidContentDir(format!(
            "missing {}/ subdirectory",
            Collection::Chapters.dir()
        )));
    }
    Ok(())
}
