//! Invocation of the functions under the Lambda runtime.
//!
//! One deployment serves one function. Callable functions answer with the
//! envelope from [`crate::functions::envelope`]; the scheduled publisher
//! ignores its trigger event and reports failures as errors so the runtime
//! records a failed run.

use anyhow::Result;
use chrono::Utc;
use clap::ValueEnum;
use serde_json::{Value, json};
use tracing::warn;

use crate::functions::average::{KNOWLEDGE, STRENGTH};
use crate::functions::{
    CallableError, CallableRequest, DayWindow, MetricSource, envelope, handle_average,
    publish_scheduled,
};
use crate::store::DocumentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FunctionName {
    #[value(name = "getKnowledgeAverage")]
    KnowledgeAverage,
    #[value(name = "getStrengthAverage")]
    StrengthAverage,
    #[value(name = "publishScheduledArticlesDaily")]
    PublishScheduledArticles,
}

impl FunctionName {
    fn metric(self) -> Option<&'static MetricSource> {
        match self {
            FunctionName::KnowledgeAverage => Some(&KNOWLEDGE),
            FunctionName::StrengthAverage => Some(&STRENGTH),
            FunctionName::PublishScheduledArticles => None,
        }
    }
}

/// Runs `function` for one invocation payload.
pub async fn dispatch<S>(
    function: FunctionName,
    store: &S,
    concurrency: usize,
    payload: Value,
) -> Result<Value>
where
    S: DocumentStore + ?Sized,
{
    let Some(metric) = function.metric() else {
        publish_scheduled(store, DayWindow::containing(Utc::now())).await?;
        return Ok(json!({}));
    };

    let outcome = match serde_json::from_value::<CallableRequest>(payload) {
        Ok(request) => handle_average(store, metric, &request, concurrency).await,
        Err(e) => {
            warn!(error = %e, "Malformed callable payload");
            Err(CallableError::InvalidArgument(
                "Request payload is not a valid callable request.".to_string(),
            ))
        }
    };

    Ok(envelope(outcome))
}
