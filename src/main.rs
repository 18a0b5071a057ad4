//! CLI entry point for the assessment functions.
//!
//! Runs a function once from the command line against the configured
//! database, or serves one function under the Lambda runtime.

use anyhow::Result;
use assessment_functions::config::Config;
use assessment_functions::functions::average::{KNOWLEDGE, STRENGTH};
use assessment_functions::functions::publisher::PUBLISH_SCHEDULE;
use assessment_functions::functions::{
    AuthContext, CallableRequest, DayWindow, MetricSource, envelope, handle_average,
    publish_scheduled,
};
use assessment_functions::lambda::{FunctionName, dispatch};
use assessment_functions::logging;
use assessment_functions::store::FirestoreClient;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use lambda_runtime::{LambdaEvent, service_fn};
use serde_json::{Value, json};
use tracing::info;

#[derive(Parser)]
#[command(name = "assessment-functions")]
#[command(about = "Assessment averages and scheduled article publishing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Metric {
    Knowledge,
    Strength,
}

impl Metric {
    fn source(self) -> &'static MetricSource {
        match self {
            Metric::Knowledge => &KNOWLEDGE,
            Metric::Strength => &STRENGTH,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a monthly average and print the callable response
    Average {
        #[arg(short, long, value_enum)]
        metric: Metric,

        /// Month as stored on assessments (`quarter.month`)
        #[arg(long)]
        month: i64,

        #[arg(long)]
        year: i64,

        /// Caller uid to attach to the request
        #[arg(long, default_value = "cli")]
        uid: String,
    },
    /// Publish scheduled articles for today (UTC) or for a given day
    Publish {
        /// Day to publish, e.g. 2024-03-01. Defaults to today.
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,
    },
    /// Serve one function under the Lambda runtime
    Lambda {
        #[arg(short, long, value_enum)]
        function: FunctionName,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let in_lambda = matches!(cli.command, Commands::Lambda { .. });
    let _log_guard = logging::init(config.log_file_path.as_deref(), !in_lambda)?;

    let store = FirestoreClient::from_config(&config)?;
    info!(
        project = %config.project_id,
        database = %config.database_id,
        emulator = config.emulator_host.is_some(),
        "Document store configured"
    );

    match cli.command {
        Commands::Average {
            metric,
            month,
            year,
            uid,
        } => {
            let request = CallableRequest::new(
                Some(AuthContext {
                    uid,
                    ..Default::default()
                }),
                json!({ "thisMonth": month, "thisYear": year }),
            );
            let outcome =
                handle_average(&store, metric.source(), &request, config.fetch_concurrency).await;
            println!("{}", serde_json::to_string_pretty(&envelope(outcome))?);
        }
        Commands::Publish { date } => {
            let window = match date {
                Some(date) => DayWindow::for_date(date),
                None => DayWindow::containing(Utc::now()),
            };
            let outcome = publish_scheduled(&store, window).await?;
            info!(published = outcome.published, "Publish run finished");
        }
        Commands::Lambda { function } => {
            let store = &store;
            let concurrency = config.fetch_concurrency;
            info!(?function, "Starting Lambda runtime");
            if function == FunctionName::PublishScheduledArticles {
                info!(schedule = PUBLISH_SCHEDULE, "Publisher expects a daily UTC trigger");
            }

            lambda_runtime::run(service_fn(|event: LambdaEvent<Value>| async move {
                dispatch(function, store, concurrency, event.payload)
                    .await
                    .map_err(lambda_runtime::Error::from)
            }))
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        }
    }

    Ok(())
}
