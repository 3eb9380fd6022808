//! Document registry backed by the key-value store.
//!
//! The whole document set is rewritten on every mutation. Persistence failures
//! are logged and the in-memory change is kept.

use chrono::Utc;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{Document, DocumentId, DocumentUpdate, DEFAULT_TITLE};
use crate::storage::{
    load_versioned, save_versioned, KvStore, DOCUMENTS_KEY, LAST_ACTIVE_KEY,
};

#[derive(Default)]
struct RegistryState {
    /// Newest first
    documents: Vec<Document>,
    active_id: Option<DocumentId>,
}

impl RegistryState {
    fn position(&self, id: &str) -> Option<usize> {
        self.documents.iter().position(|doc| doc.id == id)
    }
}

/// Owner of the live document set and the active document
pub struct DocumentRegistry {
    store: Arc<dyn KvStore>,
    state: RwLock<RegistryState>,
}

impl DocumentRegistry {
    /// Create an empty registry; call [`load`](Self::load) before use
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Read the document set from storage, creating a blank document when
    /// there is none, and restore the last active document.
    pub fn load(&self) {
        let mut migrated = false;
        let documents: Vec<Document> = match load_versioned(&*self.store, DOCUMENTS_KEY) {
            Ok(Some(loaded)) => {
                if loaded.needs_migration() {
                    info!(
                        "Migrating document set from schema v{}",
                        loaded.schema_version
                    );
                    migrated = true;
                }
                loaded.value
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Discarding unreadable document set: {}", e);
                Vec::new()
            }
        };

        let last_active = match load_versioned::<_, DocumentId>(&*self.store, LAST_ACTIVE_KEY) {
            Ok(loaded) => loaded.map(|loaded| loaded.value),
            Err(e) => {
                warn!("Ignoring unreadable last active document id: {}", e);
                None
            }
        };

        let mut state = self.state.write();
        state.documents = documents;

        if state.documents.is_empty() {
            let doc = Document::new(DEFAULT_TITLE);
            info!("No documents found, created initial document {}", doc.id);
            state.documents.push(doc);
            migrated = true;
        }
        if migrated {
            self.persist_documents(&state.documents);
        }

        let active = last_active
            .filter(|id| state.position(id).is_some())
            .unwrap_or_else(|| state.documents[0].id.clone());
        state.active_id = Some(active.clone());
        self.persist_active(&active);

        info!("Loaded {} documents, active: {}", state.documents.len(), active);
    }

    /// Create a blank document, make it active and return it
    pub fn create_document(&self, title: Option<&str>) -> Document {
        let doc = Document::new(title.unwrap_or(DEFAULT_TITLE));

        let mut state = self.state.write();
        state.documents.insert(0, doc.clone());
        state.active_id = Some(doc.id.clone());
        self.persist_documents(&state.documents);
        self.persist_active(&doc.id);

        info!("Created document: {} ({})", doc.title, doc.id);
        doc
    }

    /// Apply `update`, marking the document as unsaved
    pub fn update_document(&self, id: &str, update: DocumentUpdate) -> Option<Document> {
        let mut state = self.state.write();
        let index = state.position(id)?;

        let doc = &mut state.documents[index];
        if let Some(title) = update.title {
            doc.title = title;
        }
        if let Some(content) = update.content {
            doc.content = content;
        }
        doc.updated_at = Utc::now();
        doc.is_saved = false;
        let updated = doc.clone();

        self.persist_documents(&state.documents);
        debug!("Updated document {}", id);
        Some(updated)
    }

    pub fn rename_document(&self, id: &str, title: &str) -> Option<Document> {
        self.update_document(id, DocumentUpdate::title(title))
    }

    /// Record an explicit save
    pub fn mark_as_saved(&self, id: &str) -> Option<Document> {
        let mut state = self.state.write();
        let index = state.position(id)?;

        state.documents[index].is_saved = true;
        let saved = state.documents[index].clone();
        self.persist_documents(&state.documents);
        Some(saved)
    }

    /// Remove a document. Deleting the last document leaves a fresh blank one;
    /// deleting the active document activates the first remaining one.
    pub fn delete_document(&self, id: &str) -> Option<Document> {
        let mut state = self.state.write();
        let index = state.position(id)?;
        let removed = state.documents.remove(index);

        if state.documents.is_empty() {
            let doc = Document::new(DEFAULT_TITLE);
            debug!("Last document deleted, created {}", doc.id);
            state.active_id = Some(doc.id.clone());
            state.documents.push(doc);
        } else if state.active_id.as_deref() == Some(id) {
            state.active_id = Some(state.documents[0].id.clone());
        }

        self.persist_documents(&state.documents);
        if let Some(active) = &state.active_id {
            self.persist_active(active);
        }

        info!("Deleted document: {} ({})", removed.title, removed.id);
        Some(removed)
    }

    /// Put a previously removed document back, replacing any document with
    /// the same id
    pub fn insert_document(&self, doc: Document) -> Document {
        let mut state = self.state.write();
        match state.position(&doc.id) {
            Some(index) => state.documents[index] = doc.clone(),
            None => state.documents.insert(0, doc.clone()),
        }
        self.persist_documents(&state.documents);
        doc
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        let state = self.state.read();
        state.position(id).map(|index| state.documents[index].clone())
    }

    pub fn list(&self) -> Vec<Document> {
        self.state.read().documents.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().documents.len()
    }

    pub fn active_id(&self) -> Option<DocumentId> {
        self.state.read().active_id.clone()
    }

    pub fn active_document(&self) -> Option<Document> {
        let state = self.state.read();
        let id = state.active_id.as_deref()?;
        state.position(id).map(|index| state.documents[index].clone())
    }

    /// Switch the active document. Returns false for unknown ids.
    pub fn set_active(&self, id: &str) -> bool {
        let mut state = self.state.write();
        if state.position(id).is_none() {
            return false;
        }
        state.active_id = Some(id.to_string());
        self.persist_active(id);
        true
    }

    fn persist_documents(&self, documents: &[Document]) {
        if let Err(e) = save_versioned(&*self.store, DOCUMENTS_KEY, &documents) {
            error!("Failed to save documents: {}", e);
        }
    }

    fn persist_active(&self, id: &str) {
        if let Err(e) = save_versioned(&*self.store, LAST_ACTIVE_KEY, &id) {
            error!("Failed to save last active document: {}", e);
        }
    }
}
