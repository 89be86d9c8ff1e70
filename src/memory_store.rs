//! In-process document store implementing the document sink's collaborator
//! traits. Documents live for as long as the store does.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::document::{DocumentCollection, DocumentContext, DocumentContextFactory};
use crate::error::BoxError;

#[derive(thiserror::Error, Debug)]
pub enum MemoryStoreError {
    #[error("document has no string `_id` field")]
    MissingId,

    #[error("duplicate key `{0}`")]
    DuplicateKey(String),
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    contexts: DashMap<String, Arc<MemoryContext>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the documents stored in `source` / `collection`.
    pub fn documents(&self, source: &str, collection: &str) -> Vec<serde_json::Value> {
        self.contexts
            .get(source)
            .and_then(|context| {
                context
                    .collections
                    .get(collection)
                    .map(|stored| stored.documents.read().clone())
            })
            .unwrap_or_default()
    }

    fn context(&self, source: &str) -> Arc<MemoryContext> {
        Arc::clone(
            self.contexts
                .entry(source.to_string())
                .or_insert_with(|| Arc::new(MemoryContext::default()))
                .value(),
        )
    }
}

impl DocumentContextFactory for MemoryDocumentStore {
    fn open_context(&self, source: &str) -> Result<Arc<dyn DocumentContext>, BoxError> {
        Ok(self.context(source))
    }
}

#[derive(Default)]
pub struct MemoryContext {
    collections: DashMap<String, Arc<MemoryCollection>>,
}

impl DocumentContext for MemoryContext {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        Arc::clone(
            self.collections
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(MemoryCollection::default()))
                .value(),
        ) as Arc<dyn DocumentCollection>
    }
}

#[derive(Default)]
pub struct MemoryCollection {
    documents: RwLock<Vec<serde_json::Value>>,
}

impl DocumentCollection for MemoryCollection {
    fn insert_one(&self, document: serde_json::Value) -> Result<(), BoxError> {
        let id = document
            .get("_id")
            .and_then(|v| v.as_str())
            .ok_or(MemoryStoreError::MissingId)?
            .to_string();

        let mut documents = self.documents.write();
        if documents.iter().any(|d| d.get("_id").and_then(|v| v.as_str()) == Some(id.as_str())) {
            return Err(MemoryStoreError::DuplicateKey(id).into());
        }
        documents.push(document);
        Ok(())
    }
}
