use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::StorageError;

/// Persistent app storage for attached images.
///
/// Images arrive at a transient location (picker cache, camera roll) and are
/// copied here; the database keeps only the resulting path.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(MediaStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Copies `source` into the media directory under its own file name,
    /// adding a numeric suffix instead of overwriting an earlier copy.
    pub fn import(&self, source: &Path) -> Result<PathBuf, StorageError> {
        let file_name = source.file_name().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a file path: {}", source.display()),
            )
        })?;
        let target = self.free_path(Path::new(file_name));
        fs::copy(source, &target)?;
        debug!(from = %source.display(), to = %target.display(), "image copied");
        Ok(target)
    }

    fn free_path(&self, file_name: &Path) -> PathBuf {
        let candidate = self.root.join(file_name);
        if !candidate.exists() {
            return candidate;
        }
        let stem = file_name.file_stem().and_then(|s| s.to_str()).unwrap_or("image");
        let ext = file_name.extension().and_then(|s| s.to_str());
        (1u32..)
            .map(|n| match ext {
                Some(ext) => self.root.join(format!("{stem}-{n}.{ext}")),
                None => self.root.join(format!("{stem}-{n}")),
            })
            .find(|p| !p.exists())
            .unwrap_or(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_copies_without_clobbering() {
        let scratch = tempfile::tempdir().unwrap();
        let picked = scratch.path().join("chest.jpg");
        fs::write(&picked, b"first").unwrap();

        let media = MediaStore::new(scratch.path().join("media")).unwrap();
        let first = media.import(&picked).unwrap();
        fs::write(&picked, b"second").unwrap();
        let second = media.import(&picked).unwrap();

        assert_eq!(first, media.root().join("chest.jpg"));
        assert_eq!(second, media.root().join("chest-1.jpg"));
        assert_eq!(fs::read(&first).unwrap(), b"first");
        assert_eq!(fs::read(&second).unwrap(), b"second");
    }

    #[test]
    fn missing_source_is_an_error() {
        let scratch = tempfile::tempdir().unwrap();
        let media = MediaStore::new(scratch.path()).unwrap();
        assert!(matches!(media.import(&scratch.path().join("nope.png")), Err(StorageError::Io(_))));
    }
}
