use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use futures::StreamExt;
use std::process::ExitCode;
use std::sync::Arc;
use stockwise_core::config::Settings;
use stockwise_core::dataset::csv_file::CsvDataset;
use stockwise_core::dataset::pg::PgDataset;
use stockwise_core::dataset::CompanyDataset;
use stockwise_core::llm::Provider;
use stockwise_core::research::tavily::TavilyClient;
use stockwise_core::research::{DisabledResearch, ResearchClient};
use stockwise_core::resolver::{Resolver, ResolverConfig};
use stockwise_core::workflow::{Workflow, WorkflowConfig, WorkflowEvent};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const FAILED_EXIT: u8 = 1;
const NOT_FOUND_EXIT: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "stockwise", about = "Company lookup and BUY/HOLD/SELL analysis")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a company and run the full analysis.
    Analyze {
        /// Company name, partial name, or NSE ticker.
        query: String,

        #[command(flatten)]
        source: SourceArgs,

        /// anthropic | openai (defaults to LLM_PROVIDER, then anthropic).
        #[arg(long)]
        provider: Option<String>,

        /// Print one JSON object per event instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Only resolve the query against the dataset.
    Resolve {
        query: String,

        #[command(flatten)]
        source: SourceArgs,
    },
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// CSV export to read (overrides DATASET_CSV_PATH).
    #[arg(long, conflicts_with = "table")]
    csv: Option<String>,

    /// Postgres table to query via DATABASE_URL (overrides DATASET_TABLE).
    #[arg(long)]
    table: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Analyze {
            query,
            source,
            provider,
            json,
        } => analyze(&settings, &query, &source, provider.as_deref(), json).await,
        Command::Resolve { query, source } => resolve(&settings, &query, &source).await,
    };

    result.inspect_err(|err| {
        sentry_anyhow::capture_anyhow(err);
    })
}

async fn analyze(
    settings: &Settings,
    query: &str,
    source: &SourceArgs,
    provider: Option<&str>,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let dataset = open_dataset(settings, source).await?;
    let provider = provider.map(Provider::parse).transpose()?;
    let generator = stockwise_core::llm::build_generator(settings, provider)?;
    let research = build_research(settings)?;

    let config = WorkflowConfig {
        resolver: resolver_config(settings),
        ..Default::default()
    };
    let workflow = Workflow::assemble(dataset, generator, research, config);

    let stream = workflow.run(query);
    futures::pin_mut!(stream);

    let mut code = ExitCode::SUCCESS;
    while let Some(event) = stream.next().await {
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}\n", event.message());
        }

        if let WorkflowEvent::Failed { message, .. } = &event {
            sentry_anyhow::capture_anyhow(&anyhow::anyhow!("{message}"));
        }
        if let Some(status) = terminal_exit(&event) {
            code = ExitCode::from(status);
        }
    }
    Ok(code)
}

async fn resolve(settings: &Settings, query: &str, source: &SourceArgs) -> anyhow::Result<ExitCode> {
    let dataset = open_dataset(settings, source).await?;
    let resolver = Resolver::new(dataset, resolver_config(settings));

    match resolver.resolve(query).await? {
        Some(resolved) => {
            println!("{}", serde_json::to_string_pretty(&resolved)?);
            Ok(ExitCode::SUCCESS)
        }
        None => {
            let event = WorkflowEvent::NotFound {
                query: query.to_string(),
            };
            println!("{}", event.message());
            Ok(terminal_exit(&event).map_or(ExitCode::SUCCESS, ExitCode::from))
        }
    }
}

async fn open_dataset(
    settings: &Settings,
    source: &SourceArgs,
) -> anyhow::Result<Arc<dyn CompanyDataset>> {
    let csv_path = source.csv.as_deref().or(settings.dataset_csv_path.as_deref());
    let table = source.table.as_deref().or(settings.dataset_table.as_deref());

    if let (Some(path), None) = (csv_path, source.table.as_deref()) {
        return Ok(Arc::new(CsvDataset::from_path(path)?));
    }

    let table = table.context("no dataset configured: pass --csv or --table (or set DATASET_CSV_PATH / DATASET_TABLE)")?;
    let db_url = settings.require_database_url()?;
    let ds = PgDataset::connect(db_url, table).await?;
    tracing::info!(table, "connected to Postgres dataset");
    Ok(Arc::new(ds))
}

/// Exit status for a terminal event, shared by `analyze` and `resolve`. A completed report
/// exits 0.
fn terminal_exit(event: &WorkflowEvent) -> Option<u8> {
    match event {
        WorkflowEvent::Failed { .. } => Some(FAILED_EXIT),
        WorkflowEvent::NotFound { .. } => Some(NOT_FOUND_EXIT),
        _ => None,
    }
}

fn build_research(settings: &Settings) -> anyhow::Result<Arc<dyn ResearchClient>> {
    if settings.tavily_api_key.is_some() {
        Ok(Arc::new(TavilyClient::from_settings(settings)?))
    } else {
        tracing::warn!("TAVILY_API_KEY not set; research disabled, frameworks will use generic guidance");
        Ok(Arc::new(DisabledResearch))
    }
}

fn resolver_config(settings: &Settings) -> ResolverConfig {
    ResolverConfig {
        case: settings.match_case(),
        overrides: settings.column_overrides.clone(),
    }
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
