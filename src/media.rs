use std::path::PathBuf;

use uuid::Uuid;

/// Stores image blobs under a root directory with generated names, returning
/// the relative path used in `items.image` (served under `/media`).
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn save(&self, bytes: &[u8], ext: &str) -> std::io::Result<String> {
        let filename = format!("{}.{}", Uuid::new_v4().simple(), ext);
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(self.root.join(&filename), bytes)?;
        Ok(filename)
    }
}
