//! Access to the documents filed in folders.
//!
//! Document content lives elsewhere; the hierarchy only needs placement,
//! counts and sizes.

use crate::error::Result;
use crate::model::DocumentRef;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Documents filed directly in `folder_id`.
    async fn documents_in_folder(&self, folder_id: Uuid) -> Result<Vec<DocumentRef>>;

    /// Documents filed directly in any of `folder_ids`.
    async fn documents_for_folders(&self, folder_ids: &[Uuid]) -> Result<Vec<DocumentRef>>;

    async fn count_in_folder(&self, folder_id: Uuid) -> Result<usize> {
        Ok(self.documents_in_folder(folder_id).await?.len())
    }
}

/// Process-local document index, used when documents are not backed by a
/// database and in tests.
#[derive(Default)]
pub struct InMemoryDocumentRepository {
    docs: RwLock<HashMap<Uuid, DocumentRef>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, doc: DocumentRef) -> Uuid {
        let id = doc.id;
        self.docs.write().insert(id, doc);
        id
    }

    pub fn remove(&self, id: Uuid) -> Option<DocumentRef> {
        self.docs.write().remove(&id)
    }

    /// Refile a document; `None` leaves it unfiled.
    pub fn refile(&self, id: Uuid, folder_id: Option<Uuid>) -> bool {
        match self.docs.write().get_mut(&id) {
            Some(doc) => {
                doc.folder_id = folder_id;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn documents_in_folder(&self, folder_id: Uuid) -> Result<Vec<DocumentRef>> {
        Ok(self
            .docs
            .read()
            .values()
            .filter(|d| d.folder_id == Some(folder_id))
            .cloned()
            .collect())
    }

    async fn documents_for_folders(&self, folder_ids: &[Uuid]) -> Result<Vec<DocumentRef>> {
        let docs = self.docs.read();
        Ok(docs
            .values()
            .filter(|d| d.folder_id.map_or(false, |fid| folder_ids.contains(&fid)))
            .cloned()
            .collect())
    }

    async fn count_in_folder(&self, folder_id: Uuid) -> Result<usize> {
        Ok(self
            .docs
            .read()
            .values()
            .filter(|d| d.folder_id == Some(folder_id))
            .count())
    }
}
