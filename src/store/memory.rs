use anyhow::{Result, bail};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Document, DocumentStore, Fields, Query, WriteBatch};

type Collections = HashMap<String, BTreeMap<String, Fields>>;

/// A [`DocumentStore`] held entirely in process memory.
///
/// Every `query`, `get` and `commit` is counted, which lets callers check
/// whether a code path touched the database at all.
#[derive(Default)]
pub struct InMemoryStore {
    collections: Mutex<Collections>,
    operations: AtomicUsize,
    commits: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces a document. Not counted as an operation.
    pub fn insert(&self, collection: &str, id: &str, fields: Fields) {
        self.lock()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
    }

    /// Reads a document without counting it as an operation.
    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.lock()
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document::new(id, fields.clone()))
    }

    /// Number of `query`, `get` and `commit` calls served so far.
    pub fn operations(&self) -> usize {
        self.operations.load(Ordering::SeqCst)
    }

    /// Number of batches committed so far.
    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Collections> {
        self.collections
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl DocumentStore for InMemoryStore {
    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        self.operations.fetch_add(1, Ordering::SeqCst);

        let collections = self.lock();
        let Some(docs) = collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .map(|(id, fields)| Document::new(id.as_str(), fields.clone()))
            .filter(|doc| query.matches(doc))
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.operations.fetch_add(1, Ordering::SeqCst);
        Ok(self.document(collection, id))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.operations.fetch_add(1, Ordering::SeqCst);

        let mut collections = self.lock();

        // Validate the whole batch before touching anything.
        for update in batch.updates() {
            let exists = collections
                .get(&update.collection)
                .is_some_and(|docs| docs.contains_key(&update.id));
            if !exists {
                bail!(
                    "no document to update: {}/{}",
                    update.collection,
                    update.id
                );
            }
        }

        for update in batch.updates() {
            if let Some(fields) = collections
                .get_mut(&update.collection)
                .and_then(|docs| docs.get_mut(&update.id))
            {
                fields.extend(update.fields.clone());
            }
        }

        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
