//! Collaborator implementations backed by memory or JSON files

pub mod file;
pub mod memory;

pub use file::{FileArtifactStore, FileBrdStore, FileTemplateCatalog};
pub use memory::{InMemoryArtifactStore, InMemoryBrdStore, InMemoryTemplateCatalog, InMemoryVectorIndex};
