use crate::domain::ports::Storage;
use crate::utils::error::Result;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Data directory holding the timesheet exports.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = tokio::fs::read(self.full_path(path)).await?;
        Ok(data)
    }

    async fn list_files(&self) -> Result<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                files.push(name.to_string());
            }
        }

        files.sort();
        Ok(files)
    }

    async fn modified(&self, path: &str) -> Result<DateTime<Utc>> {
        let metadata = tokio::fs::metadata(self.full_path(path)).await?;
        Ok(DateTime::<Utc>::from(metadata.modified()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_list_and_read_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.csv"), "x").unwrap();
        std::fs::write(dir.path().join("a.xls"), "y").unwrap();
        std::fs::create_dir(dir.path().join("archive")).unwrap();

        let storage = LocalStorage::new(dir.path());
        assert_eq!(storage.list_files().await.unwrap(), vec!["a.xls", "b.csv"]);
        assert_eq!(storage.read_file("b.csv").await.unwrap(), b"x");
        assert!(storage.read_file("missing.csv").await.is_err());
    }

    #[test]
    fn test_modified_time() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.csv"), "x").unwrap();
        let storage = LocalStorage::new(dir.path());

        let modified = tokio_test::block_on(storage.modified("a.csv")).unwrap();
        assert!((Utc::now() - modified).num_minutes() < 5);
    }
}
