mod config;

use clap::{Parser, Subcommand, ValueEnum};
use config::RagserveConfig;
use ragserve_gateway::{GatewayServer, QueryRequest, QueryResponse};
use ragserve_memory::RagService;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ragserve",
    version,
    about = "ragserve: retrieval-augmented answers over a local corpus"
)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "ragserve.toml")]
    config: PathBuf,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the corpus and start the HTTP server
    Serve {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
        /// Corpus file (overrides config)
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Run a single query and print the JSON response
    Query {
        /// The question to answer
        text: String,
        /// Number of documents to retrieve
        #[arg(short, long)]
        k: Option<usize>,
        /// Corpus file (overrides config)
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.log_format);

    let mut config = RagserveConfig::load(&cli.config).await?;

    match cli.command {
        Commands::Serve { host, port, corpus } => {
            if let Some(corpus) = corpus {
                config.corpus.path = corpus;
            }
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            info!("Starting ragserve on {}:{}", host, port);
            let start = Instant::now();

            let service = Arc::new(RagService::new(config.service_config()));
            info!(corpus = %service.config().corpus_path.display(), "Loading corpus");
            let pipeline = service.pipeline().await.map_err(|e| {
                error!(
                    error = %e,
                    fatal = e.is_fatal_at_startup(),
                    "Failed to initialize pipeline"
                );
                anyhow::anyhow!("Failed to initialize pipeline: {e}")
            })?;

            let documents = pipeline.document_count().await;
            info!(
                documents,
                model = pipeline.encoder().model_name(),
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Startup completed"
            );

            let app = GatewayServer::build_with_limits(service, config.query_limits());

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            info!("ragserve listening on {}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            info!("Shutting down ragserve");
        }
        Commands::Query { text, k, corpus } => {
            if let Some(corpus) = corpus {
                config.corpus.path = corpus;
            }
            let request = QueryRequest { query: text, k };
            let k = request.validate(&config.query_limits())?;

            let service = RagService::new(config.service_config());
            let pipeline = service.pipeline().await?;
            let result = pipeline.query(&request.query, k).await?;

            let response = QueryResponse::from(result);
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
}
