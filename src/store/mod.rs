//! Document database access.
//!
//! [`DocumentStore`] is the async trait every handler is written against.
//! [`InMemoryStore`] keeps documents in process memory and
//! [`FirestoreClient`] talks to Cloud Firestore over its REST API.

mod document;
pub mod firestore;
mod memory;
mod query;

pub use document::{Document, DocumentRef, FieldValue, Fields};
pub use firestore::FirestoreClient;
pub use memory::InMemoryStore;
pub use query::{FieldUpdate, Filter, FilterOp, Query, WriteBatch};

use anyhow::Result;

#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns every document in the collection matching all filters.
    async fn query(&self, query: &Query) -> Result<Vec<Document>>;

    /// Point-read by identifier. A missing document is `Ok(None)`.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Applies every update in the batch, or none of them.
    async fn commit(&self, batch: WriteBatch) -> Result<()>;
}
