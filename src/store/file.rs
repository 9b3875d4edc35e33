//! JSON-file collaborator implementations
//!
//! Layout under the data directory:
//!
//! ```text
//! artifacts/<document_id>.json   array of text chunks
//! brds/<brd_id>.json             one BRD record
//! templates.json                 array of template descriptors
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::backends::{ArtifactStore, BrdStore, TemplateCatalog};
use crate::errors::{AssistError, Result};
use crate::types::{BrdRecord, TemplateDescriptor};

/// Ids become file names, so anything that could escape the directory is rejected
fn checked_file_name(id: &str) -> Result<String> {
    if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
        return Err(AssistError::InvalidInput(format!("Invalid identifier: {:?}", id)));
    }
    Ok(format!("{}.json", id))
}

/// Read and decode a JSON file; `None` when the file does not exist
async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    match tokio::fs::read_to_string(path).await {
        Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AssistError::Io(e)),
    }
}

/// Artifact chunks stored as one JSON array per document
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    dir: PathBuf,
}

impl FileArtifactStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("artifacts"),
        }
    }
}

#[async_trait]
impl ArtifactStore for FileArtifactStore {
    async fn find_by_document_name(&self, document_id: &str) -> Result<Vec<String>> {
        let path = self.dir.join(checked_file_name(document_id)?);
        read_json::<Vec<String>>(&path)
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| AssistError::ArtifactStore(e.to_string()))
    }
}

/// Template catalog backed by a single JSON file
#[derive(Debug, Clone)]
pub struct FileTemplateCatalog {
    path: PathBuf,
}

impl FileTemplateCatalog {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join("templates.json"),
        }
    }
}

#[async_trait]
impl TemplateCatalog for FileTemplateCatalog {
    async fn get_all_templates(&self) -> Result<Vec<TemplateDescriptor>> {
        read_json::<Vec<TemplateDescriptor>>(&self.path)
            .await
            .map_err(|e| AssistError::TemplateCatalog(e.to_string()))?
            .ok_or_else(|| {
                AssistError::TemplateCatalog(format!("Catalog file missing: {}", self.path.display()))
            })
    }
}

/// BRD records stored one file per record
#[derive(Debug, Clone)]
pub struct FileBrdStore {
    dir: PathBuf,
}

impl FileBrdStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("brds"),
        }
    }
}

#[async_trait]
impl BrdStore for FileBrdStore {
    async fn find_by_id(&self, brd_id: &str) -> Result<Option<BrdRecord>> {
        let path = self.dir.join(checked_file_name(brd_id)?);
        read_json::<BrdRecord>(&path)
            .await
            .map_err(|e| AssistError::BrdStore(e.to_string()))
    }
}
