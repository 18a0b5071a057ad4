//! The deployed functions.
//!
//! Two callable handlers average a metric over a month's assessments
//! ([`average`]); one scheduled job publishes the day's articles
//! ([`publisher`]). All of them are written against [`crate::store::DocumentStore`].

pub mod average;
pub mod callable;
pub mod publisher;
pub mod tally;

pub use average::{AverageResult, MetricSource, Period, compute_average, handle_average};
pub use callable::{AuthContext, CallableError, CallableRequest, envelope};
pub use publisher::{DayWindow, PublishOutcome, publish_scheduled};
