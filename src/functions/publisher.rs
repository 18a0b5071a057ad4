//! Daily job that publishes the articles scheduled for the current UTC day.
//!
//! The window is always one calendar day. Articles whose `published_at`
//! falls on a day when the job did not run are not picked up later; they need
//! a run for that explicit day (see [`DayWindow::for_date`]).

use anyhow::{Context, Result};
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use tracing::info;

use crate::store::{DocumentStore, FieldValue, Fields, Filter, Query, WriteBatch};

pub const ARTICLES: &str = "articles";
pub const STATUS_SCHEDULED: &str = "Scheduled";
pub const STATUS_PUBLISHED: &str = "Published";

/// Cron expression the trigger is expected to use: every day at 00:00 UTC.
pub const PUBLISH_SCHEDULE: &str = "0 0 * * *";

/// Half-open interval `[start, end)` covering one UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn for_date(date: NaiveDate) -> Self {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let end = date
            .checked_add_days(Days::new(1))
            .map(|next| next.and_time(NaiveTime::MIN).and_utc())
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { start, end }
    }

    /// The UTC calendar day `now` falls in.
    pub fn containing(now: DateTime<Utc>) -> Self {
        Self::for_date(now.date_naive())
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PublishOutcome {
    /// Articles flipped to published. Zero means nothing was committed.
    pub published: usize,
}

/// Publishes every scheduled article whose `published_at` lies in `window`,
/// in a single atomic batch.
#[tracing::instrument(skip(store, window), fields(start = %window.start, end = %window.end))]
pub async fn publish_scheduled<S>(store: &S, window: DayWindow) -> Result<PublishOutcome>
where
    S: DocumentStore + ?Sized,
{
    let query = Query::new(ARTICLES)
        .filter(Filter::eq("status", STATUS_SCHEDULED))
        .filter(Filter::gte("published_at", window.start))
        .filter(Filter::lt("published_at", window.end));

    let articles = store
        .query(&query)
        .await
        .context("failed to query scheduled articles")?;

    if articles.is_empty() {
        info!("No scheduled articles to publish today");
        return Ok(PublishOutcome::default());
    }

    let mut batch = WriteBatch::new();
    for article in &articles {
        batch.update(
            ARTICLES,
            &article.id,
            Fields::from([("status".to_string(), FieldValue::from(STATUS_PUBLISHED))]),
        );
    }

    store
        .commit(batch)
        .await
        .context("failed to commit publish batch")?;

    info!(published = articles.len(), "Published scheduled articles");
    Ok(PublishOutcome {
        published: articles.len(),
    })
}
