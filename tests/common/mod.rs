#![allow(dead_code)]

use anyhow::{Result, anyhow};
use assessment_functions::functions::{AuthContext, CallableRequest};
use assessment_functions::store::{
    Document, DocumentRef, DocumentStore, FieldValue, Fields, InMemoryStore, Query, WriteBatch,
};
use serde_json::{Value, json};
use std::time::Duration;

pub fn fields<const N: usize>(entries: [(&str, FieldValue); N]) -> Fields {
    entries
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

pub fn assessment(month: i64, year: i64, reference_field: &str, reference: FieldValue) -> Fields {
    fields([
        ("quarter", FieldValue::Map(fields([("month", month.into())]))),
        ("year", year.into()),
        (reference_field, reference),
    ])
}

pub fn reference(collection: &str, id: &str) -> FieldValue {
    DocumentRef::to(collection, id).into()
}

pub fn signed_in(data: Value) -> CallableRequest {
    CallableRequest::new(
        Some(AuthContext {
            uid: "user-1".to_string(),
            ..Default::default()
        }),
        data,
    )
}

pub fn period(month: i64, year: i64) -> Value {
    json!({ "thisMonth": month, "thisYear": year })
}

/// A store whose every operation fails.
pub struct FailingStore;

#[async_trait::async_trait]
impl DocumentStore for FailingStore {
    async fn query(&self, _query: &Query) -> Result<Vec<Document>> {
        Err(anyhow!("connection reset by peer"))
    }

    async fn get(&self, _collection: &str, _id: &str) -> Result<Option<Document>> {
        Err(anyhow!("connection reset by peer"))
    }

    async fn commit(&self, _batch: WriteBatch) -> Result<()> {
        Err(anyhow!("connection reset by peer"))
    }
}

/// Wraps an [`InMemoryStore`] and delays point-reads so that earlier reads
/// finish later.
pub struct ShuffledStore {
    pub inner: InMemoryStore,
}

#[async_trait::async_trait]
impl DocumentStore for ShuffledStore {
    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        self.inner.query(query).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let delay = id.bytes().map(u64::from).sum::<u64>() % 7;
        tokio::time::sleep(Duration::from_millis(delay * 5)).await;
        self.inner.get(collection, id).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.inner.commit(batch).await
    }
}

/// Fails point-reads for one identifier only.
pub struct FlakyReadStore {
    pub inner: InMemoryStore,
    pub broken_id: &'static str,
}

#[async_trait::async_trait]
impl DocumentStore for FlakyReadStore {
    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        self.inner.query(query).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        if id == self.broken_id {
            return Err(anyhow!("deadline exceeded"));
        }
        self.inner.get(collection, id).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.inner.commit(batch).await
    }
}

/// Reads go to the inner store; every commit fails.
pub struct RejectingCommitStore {
    pub inner: InMemoryStore,
}

#[async_trait::async_trait]
impl DocumentStore for RejectingCommitStore {
    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        self.inner.query(query).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn commit(&self, _batch: WriteBatch) -> Result<()> {
        Err(anyhow!("transaction aborted"))
    }
}
