//! Monthly average of one numeric field across the documents that a period's
//! assessments point at.
//!
//! Each assessment carries a reference to exactly one related document. The
//! related documents are read concurrently and only those holding a number in
//! the target field contribute to the result.

use anyhow::{Context, Result};
use futures::{StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, error, info};

use super::callable::{CallableError, CallableRequest};
use super::tally::Tally;
use crate::store::{Document, DocumentStore, FieldValue, Filter, Query};

pub const ASSESSMENTS: &str = "assessments";

const MISSING_PERIOD: &str = "thisMonth and thisYear must be provided in the request data.";

/// Where a metric's values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricSource {
    pub name: &'static str,
    /// Reference field on the assessment.
    pub reference_field: &'static str,
    /// Collection the reference points into.
    pub collection: &'static str,
    /// Numeric field averaged on the referenced documents.
    pub value_field: &'static str,
}

pub const KNOWLEDGE: MetricSource = MetricSource {
    name: "knowledge",
    reference_field: "knowledge_id",
    collection: "knowledge",
    value_field: "correct_responses",
};

pub const STRENGTH: MetricSource = MetricSource {
    name: "strength",
    reference_field: "strengthId",
    collection: "strength",
    value_field: "elapsed_time",
};

/// Month and year an assessment belongs to, as sent by the caller.
///
/// Neither range nor type is checked: a period that no assessment carries,
/// such as month 13 or the string `"3"`, simply matches nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Period {
    pub month: FieldValue,
    pub year: FieldValue,
}

impl Period {
    /// Reads `thisMonth` and `thisYear` from a callable payload.
    ///
    /// Fails only when either is absent or falsy: `null`, `false`, `0` or `""`.
    pub fn from_data(data: &Value) -> Result<Self, CallableError> {
        match (provided(data.get("thisMonth")), provided(data.get("thisYear"))) {
            (Some(month), Some(year)) => Ok(Self { month, year }),
            _ => Err(CallableError::InvalidArgument(MISSING_PERIOD.to_string())),
        }
    }
}

fn provided(value: Option<&Value>) -> Option<FieldValue> {
    let value = value?;
    let falsy = match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    };
    (!falsy).then(|| FieldValue::from_json(value))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageResult {
    pub average: f64,
    pub count: u64,
}

impl AverageResult {
    pub fn empty() -> Self {
        Self {
            average: 0.0,
            count: 0,
        }
    }
}

impl From<Tally> for AverageResult {
    fn from(tally: Tally) -> Self {
        Self {
            average: tally.mean(),
            count: tally.count(),
        }
    }
}

/// Counts how many assessments point at each referenced document.
///
/// Only reference values count; a missing field, a plain string or any other
/// value is skipped.
fn count_references<'a>(assessments: &'a [Document], field: &str) -> HashMap<&'a str, u64> {
    let mut counts = HashMap::new();
    for assessment in assessments {
        match assessment.reference(field).map(|r| r.id()) {
            Some(id) if !id.is_empty() => *counts.entry(id).or_insert(0) += 1,
            _ => debug!(assessment = %assessment.id, field, "Assessment has no usable reference"),
        }
    }
    counts
}

/// Computes the average for `metric` over the assessments of `period`.
///
/// Each distinct referenced document is read once, at most `concurrency`
/// reads at a time. A document referenced by several assessments contributes
/// once per assessment. Missing documents and non-numeric values contribute
/// nothing.
#[tracing::instrument(
    skip(store, metric, period),
    fields(metric = metric.name, month = ?period.month, year = ?period.year)
)]
pub async fn compute_average<S>(
    store: &S,
    metric: &MetricSource,
    period: Period,
    concurrency: usize,
) -> Result<AverageResult>
where
    S: DocumentStore + ?Sized,
{
    let query = Query::new(ASSESSMENTS)
        .filter(Filter::eq("quarter.month", period.month))
        .filter(Filter::eq("year", period.year));
    let assessments = store
        .query(&query)
        .await
        .context("failed to query assessments")?;

    if assessments.is_empty() {
        info!("No assessments found for the given month and year");
        return Ok(AverageResult::empty());
    }

    let references = count_references(&assessments, metric.reference_field);
    if references.is_empty() {
        info!(
            field = metric.reference_field,
            "No references found in assessments"
        );
        return Ok(AverageResult::empty());
    }

    info!(
        assessments = assessments.len(),
        documents = references.len(),
        "Fetching referenced documents"
    );

    let tally = stream::iter(references)
        .map(move |(id, times)| async move {
            let doc = store
                .get(metric.collection, id)
                .await
                .with_context(|| format!("failed to read {}/{}", metric.collection, id))?;
            let value = doc.and_then(|doc| doc.number(metric.value_field));
            Ok::<_, anyhow::Error>(value.map(|value| (value, times)))
        })
        .buffer_unordered(concurrency.max(1))
        .try_fold(Tally::default(), |mut tally, contribution| async move {
            if let Some((value, times)) = contribution {
                tally.add(value, times);
            }
            Ok::<_, anyhow::Error>(tally)
        })
        .await?;

    let result = AverageResult::from(tally);
    info!(
        average = result.average,
        count = result.count,
        "Calculated average"
    );
    Ok(result)
}

/// Callable entry point: checks the caller and the payload, then computes.
///
/// Validation failures are reported before the store is touched. Any store
/// failure is logged here and reported to the caller only as
/// [`CallableError::Internal`].
pub async fn handle_average<S>(
    store: &S,
    metric: &MetricSource,
    request: &CallableRequest,
    concurrency: usize,
) -> Result<AverageResult, CallableError>
where
    S: DocumentStore + ?Sized,
{
    let caller = request.require_auth()?;
    let period = Period::from_data(&request.data)?;

    compute_average(store, metric, period, concurrency)
        .await
        .map_err(|err| {
            error!(
                metric = metric.name,
                uid = %caller.uid,
                error = ?err,
                "Error calculating average"
            );
            CallableError::Internal(format!("Error calculating {} average.", metric.name))
        })
}
