use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use arrow::util::pretty::pretty_format_batches;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use serde_json::json;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use sls_datasource::{api::AppState, http, load_samples, load_settings};
use slsquery::{DataQuery, DataSourceSettings, QueryEngine, TimeRange};

#[derive(Debug, Parser)]
#[command(about = "Query SLS-style logs and shape the results into frames")]
struct Cli {
    /// Datasource settings file; overrides the source flags
    #[arg(long)]
    settings: Option<PathBuf>,
    /// Directory of sample log files served by the in-memory store
    #[arg(long, default_value = concat!(env!("CARGO_MANIFEST_DIR"), "/../samples"))]
    samples: PathBuf,
    #[command(flatten)]
    source: SourceArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct SourceArgs {
    #[arg(long, env = "SLS_ENDPOINT", default_value = "")]
    endpoint: String,
    #[arg(long, env = "SLS_PROJECT", default_value = "demo")]
    project: String,
    #[arg(long, env = "SLS_LOGSTORE", default_value = "access")]
    logstore: String,
    #[arg(long, env = "SLS_ACCESS_KEY_ID", default_value = "")]
    access_key_id: String,
    #[arg(long, env = "SLS_ACCESS_KEY_SECRET", default_value = "", hide_env_values = true)]
    access_key_secret: String,
}

impl SourceArgs {
    fn settings(&self) -> DataSourceSettings {
        DataSourceSettings {
            url: self.endpoint.clone(),
            json_data: json!({ "project": self.project, "logstore": self.logstore }),
            secure_json_data: [
                ("accessKeyId".to_string(), self.access_key_id.clone()),
                ("accessKeySecret".to_string(), self.access_key_secret.clone()),
            ]
            .into(),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the datasource HTTP API
    Serve {
        #[arg(long, default_value = "0.0.0.0:5080")]
        listen: SocketAddr,
    },
    /// Run one query and print its frames
    Query {
        #[arg(help = r#"Query text, `search | sql`

Examples:
    status:500
    * | select host, count(*) as c group by host
    * | select __time__ - __time__ % $1m as t, count(*) as pv group by t order by t"#)]
        query: String,
        #[arg(long, default_value = "")]
        xcol: String,
        #[arg(long, default_value = "")]
        ycol: String,
        /// Unix seconds; defaults to the start of the samples
        #[arg(long)]
        from: Option<i64>,
        /// Unix seconds; defaults to the end of the samples
        #[arg(long)]
        to: Option<i64>,
        #[arg(long, default_value_t = 100)]
        page_size: i64,
        #[arg(long, default_value_t = 1)]
        page: i64,
    },
    /// Probe the log source
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => cli.source.settings(),
    };
    let samples = load_samples(&cli.samples).await?;
    let engine = QueryEngine::new(Arc::new(samples.store));

    match cli.command {
        Command::Serve { listen } => {
            let state = AppState {
                engine,
                settings: Arc::new(settings),
            };
            http::server(listen, state).await?;
        }
        Command::Query {
            query,
            xcol,
            ycol,
            from,
            to,
            page_size,
            page,
        } => {
            let time_range = TimeRange {
                from: OffsetDateTime::from_unix_timestamp(from.unwrap_or(samples.start))?,
                to: OffsetDateTime::from_unix_timestamp(to.unwrap_or(samples.end))?,
            };
            let query = DataQuery {
                xcol,
                ycol,
                logs_per_page: page_size,
                current_page: page,
                time_range,
                ..DataQuery::new("A", query)
            };

            let start_time = std::time::Instant::now();
            let resp = engine
                .query_data(&settings, vec![query], CancellationToken::new())
                .await?;
            tracing::info!("execute time: {:?}", start_time.elapsed());

            for result in resp.results.values() {
                if let Some(error) = &result.error {
                    return Err(eyre!("query {} failed: {error}", result.ref_id));
                }
                // frames differ in schema, so each gets its own table
                for frame in &result.frames {
                    let batch = frame.to_record_batch()?;
                    println!("{}", pretty_format_batches(&[batch])?);
                }
            }
        }
        Command::Health => {
            let health = engine.check_health(&settings).await?;
            println!("{}: {}", health.status, health.message);
        }
    }
    Ok(())
}
