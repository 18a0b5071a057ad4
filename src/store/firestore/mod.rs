//! Cloud Firestore REST (v1) implementation of [`DocumentStore`].

mod wire;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::{Method, Response, StatusCode, Url};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::Config;
use crate::http::{BasicClient, Bearer, HttpClient, empty_request, json_request};
use crate::store::{Document, DocumentStore, Filter, FilterOp, Query, WriteBatch};
use wire::{WireDocument, encode, encode_fields};

const PRODUCTION_BASE_URL: &str = "https://firestore.googleapis.com/v1";
/// Token the emulator accepts as a fully privileged caller.
const EMULATOR_TOKEN: &str = "owner";

#[derive(Deserialize)]
struct RunQueryItem {
    document: Option<WireDocument>,
}

pub struct FirestoreClient<C> {
    http: C,
    base_url: String,
    root: String,
}

impl FirestoreClient<Bearer<BasicClient>> {
    /// Connects to the emulator when `FIRESTORE_EMULATOR_HOST` is set, and
    /// to production with the configured access token otherwise.
    pub fn from_config(config: &Config) -> Result<Self> {
        let (base_url, token) = match (&config.emulator_host, &config.access_token) {
            (Some(host), _) => (format!("http://{host}/v1"), EMULATOR_TOKEN),
            (None, Some(token)) => (PRODUCTION_BASE_URL.to_string(), token.as_str()),
            (None, None) => bail!("no Firestore access token configured"),
        };

        let http = Bearer::new(BasicClient::new()?, token)?;
        Ok(Self::new(
            http,
            &base_url,
            &config.project_id,
            &config.database_id,
        ))
    }
}

impl<C: HttpClient> FirestoreClient<C> {
    /// `base_url` includes the API version, e.g. `https://firestore.googleapis.com/v1`.
    pub fn new(http: C, base_url: &str, project_id: &str, database_id: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            root: format!("projects/{project_id}/databases/{database_id}/documents"),
        }
    }

    fn documents_url(&self) -> String {
        format!("{}/{}", self.base_url, self.root)
    }

    /// URL of one document. Each segment is percent-encoded, so ids holding
    /// `?`, `#`, `%` or spaces stay inside the path.
    fn document_url(&self, collection: &str, id: &str) -> Result<Url> {
        let mut url = Url::parse(&self.documents_url())
            .with_context(|| format!("invalid Firestore base URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|()| anyhow!("Firestore base URL {} cannot hold a path", self.base_url))?
            .push(collection)
            .push(id);
        Ok(url)
    }

    async fn send(&self, req: reqwest::Request) -> Result<Response> {
        let url = req.url().to_string();
        self.http
            .execute(req)
            .await
            .with_context(|| format!("Firestore request to {url} failed"))
    }

    fn structured_query(&self, query: &Query) -> Value {
        let mut structured = json!({
            "from": [{"collectionId": query.collection}],
        });

        let mut filters: Vec<Value> = query
            .filters
            .iter()
            .map(|f| self.field_filter(f))
            .collect();

        let condition = match filters.len() {
            0 => None,
            1 => filters.pop(),
            _ => Some(json!({
                "compositeFilter": {"op": "AND", "filters": filters}
            })),
        };
        if let Some(condition) = condition {
            structured["where"] = condition;
        }

        json!({ "structuredQuery": structured })
    }

    fn field_filter(&self, filter: &Filter) -> Value {
        let op = match filter.op {
            FilterOp::Equal => "EQUAL",
            FilterOp::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            FilterOp::LessThan => "LESS_THAN",
        };
        json!({
            "fieldFilter": {
                "field": {"fieldPath": filter.field},
                "op": op,
                "value": encode(&filter.value, &self.root),
            }
        })
    }
}

async fn error_for_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    bail!("Firestore returned status {}: {}", status, body)
}

#[async_trait]
impl<C: HttpClient> DocumentStore for FirestoreClient<C> {
    async fn query(&self, query: &Query) -> Result<Vec<Document>> {
        let url = format!("{}:runQuery", self.documents_url());
        let req = json_request(Method::POST, &url, &self.structured_query(query))?;

        let response = error_for_status(self.send(req).await?).await?;
        let items: Vec<RunQueryItem> = response
            .json()
            .await
            .context("failed to parse runQuery response")?;

        let docs = items
            .into_iter()
            .filter_map(|item| item.document)
            .map(WireDocument::into_document)
            .collect::<Result<Vec<_>>>()?;

        debug!(collection = %query.collection, matched = docs.len(), "Query complete");
        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let url = self.document_url(collection, id)?;
        let response = self.send(empty_request(Method::GET, url.as_str())?).await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let doc: WireDocument = error_for_status(response)
            .await?
            .json()
            .await
            .with_context(|| format!("failed to parse document {collection}/{id}"))?;

        Ok(Some(doc.into_document()?))
    }

    async fn commit(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let writes: Vec<Value> = batch
            .updates()
            .iter()
            .map(|update| {
                let field_paths: Vec<&str> = update.fields.keys().map(String::as_str).collect();
                json!({
                    "update": {
                        "name": format!("{}/{}/{}", self.root, update.collection, update.id),
                        "fields": encode_fields(&update.fields, &self.root),
                    },
                    "updateMask": {"fieldPaths": field_paths},
                    "currentDocument": {"exists": true},
                })
            })
            .collect();

        let url = format!("{}:commit", self.documents_url());
        let req = json_request(Method::POST, &url, &json!({ "writes": writes }))?;
        error_for_status(self.send(req).await?).await?;

        debug!(writes = batch.len(), "Batch committed");
        Ok(())
    }
}
