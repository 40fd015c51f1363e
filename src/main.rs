use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Parser};

use postman_exporter::config::ExporterConfig;

#[derive(Parser)]
#[command(
    name = "postman-exporter",
    about = "Prometheus exporter for scheduled Postman collection runs via Newman",
    version,
    long_about = None
)]
struct Cli {
    /// Local collection file to run
    #[arg(long, env = "COLLECTION_FILE", default_value = "./collection.json")]
    collection_file: PathBuf,

    /// Remote collection URL, downloaded at startup (takes priority over the file)
    #[arg(long, env = "COLLECTION_URL")]
    collection_url: Option<String>,

    /// Local environment file passed to every run
    #[arg(long, env = "ENVIRONMENT_FILE")]
    environment_file: Option<PathBuf>,

    /// Remote environment URL, downloaded at startup (takes priority over the file)
    #[arg(long, env = "ENV_URL")]
    env_url: Option<String>,

    /// Port for the metrics endpoint
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Seconds between runs of each collection
    #[arg(long, env = "RUN_INTERVAL", default_value_t = 30,
          value_parser = clap::value_parser!(u64).range(1..))]
    run_interval: u64,

    /// Iterations per run
    #[arg(long, env = "RUN_ITERATIONS", default_value_t = 1,
          value_parser = clap::value_parser!(u64).range(1..))]
    run_iterations: u64,

    /// Stop a run on the first request or assertion failure
    #[arg(long, env = "ENABLE_BAIL", default_value_t = false, action = ArgAction::Set)]
    enable_bail: bool,

    /// Render per-request detail metrics
    #[arg(long, env = "ENABLE_REQUEST_METRICS", default_value_t = true, action = ArgAction::Set)]
    enable_request_metrics: bool,

    /// Directory of collection files; when non-empty, one worker runs per file
    #[arg(long, env = "SETTINGS_DIR", default_value = "./settings")]
    settings_dir: PathBuf,

    /// Directory for downloads and debug artifacts
    #[arg(long, env = "WORK_DIR", default_value = ".")]
    work_dir: PathBuf,

    /// Newman binary to invoke
    #[arg(long, env = "NEWMAN_BIN", default_value = "newman")]
    newman_bin: String,
}

impl Cli {
    fn into_config(self) -> ExporterConfig {
        ExporterConfig {
            collection_file: self.collection_file,
            collection_url: self.collection_url,
            environment_file: self.environment_file,
            environment_url: self.env_url,
            port: self.port,
            interval_secs: self.run_interval,
            iterations: self.run_iterations,
            bail: self.enable_bail,
            request_metrics: self.enable_request_metrics,
            settings_dir: self.settings_dir,
            work_dir: self.work_dir,
            newman_bin: self.newman_bin,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        port = cli.port,
        interval_secs = cli.run_interval,
        "Starting postman-exporter"
    );

    postman_exporter::serve(cli.into_config()).await
}
