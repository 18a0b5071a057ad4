//! HTTP transport used by the REST-backed document store.

mod basic;
mod bearer;
mod client;

pub use basic::BasicClient;
pub use bearer::Bearer;
pub use client::HttpClient;

use anyhow::Result;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request};
use serde::Serialize;

/// Builds a request carrying `body` as JSON.
pub fn json_request<T: Serialize>(method: Method, url: &str, body: &T) -> Result<Request> {
    let mut req = Request::new(method, url.parse()?);
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());
    Ok(req)
}

/// Builds a bodyless request.
pub fn empty_request(method: Method, url: &str) -> Result<Request> {
    Ok(Request::new(method, url.parse()?))
}
