mod api;
mod config;
mod terminal_output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use platelens_config::PlateLensConfig;
use platelens_core::PipelineRun;
use platelens_logging::redact_sensitive_data;
use platelens_pipeline::Session;

use api::AppState;

#[derive(Parser)]
#[command(name = "platelens")]
#[command(about = "PlateLens: detect, sharpen, read and validate vehicle number plates")]
#[command(version)]
struct Cli {
    /// Config file (default: $PLATELENS_CONFIG_DIR/config.yaml or ~/.platelens/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one photo and print the result
    Analyze {
        /// Path to the photo
        path: PathBuf,
        /// Print the final run as JSON
        #[arg(long)]
        json: bool,
        /// Use the offline mock model instead of Gemini
        #[arg(long)]
        mock: bool,
    },
    /// Start the HTTP API server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind the HTTP server to
        #[arg(long)]
        bind: Option<String>,
        /// Use the offline mock model instead of Gemini
        #[arg(long)]
        mock: bool,
    },
    /// Show the effective config with secrets redacted
    Config {
        /// Print only the config file path
        #[arg(long)]
        path: bool,
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            terminal_output::note_error(&redact_sensitive_data(&format!("{e:#}")));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config_path = config::resolve_config_path(cli.config);

    if let Commands::Config { path: true, .. } = cli.command {
        println!("{}", config_path.display());
        return Ok(ExitCode::SUCCESS);
    }
    if let Commands::Config { init: true, .. } = cli.command {
        return init_config(&config_path).await;
    }

    let app_config = platelens_config::load_and_prepare(&config_path).await?;
    platelens_logging::init_logger(&config::log_options(&app_config))?;

    match cli.command {
        Commands::Analyze { path, json, mock } => analyze(&app_config, &path, json, mock).await,
        Commands::Serve { port, bind, mock } => {
            let port = port.unwrap_or_else(|| app_config.port());
            let bind = bind.unwrap_or_else(|| app_config.bind().to_string());
            serve(&app_config, &bind, port, mock).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config { .. } => {
            let shown = platelens_config::redacted_config(&app_config)?;
            println!("# {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(&shown)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn init_config(path: &std::path::Path) -> Result<ExitCode> {
    if tokio::fs::try_exists(path).await.unwrap_or(false) {
        terminal_output::note_warn(&format!("Config already exists at {}", path.display()));
        return Ok(ExitCode::SUCCESS);
    }
    platelens_config::write_config(&platelens_config::initial_config(), path).await?;
    terminal_output::note_success(&format!("Wrote {}", path.display()));
    Ok(ExitCode::SUCCESS)
}

async fn analyze(
    app_config: &PlateLensConfig,
    path: &std::path::Path,
    json: bool,
    mock: bool,
) -> Result<ExitCode> {
    let pipeline = config::build_pipeline(app_config, mock)?;
    let mut session = Session::new(pipeline);

    let image = platelens_media::load_image(path).await?;
    session.upload(image)?;

    let run = if json {
        session.analyze(None).await.clone()
    } else {
        let (tx, rx) = mpsc::unbounded_channel::<PipelineRun>();
        let printer = tokio::spawn(terminal_output::follow_progress(rx, std::io::stderr()));
        let run = session.analyze(Some(&tx)).await.clone();
        drop(tx);
        printer.await.context("Progress printer task failed")?;
        eprintln!();
        run
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&run)?);
    } else {
        print!("{}", terminal_output::render_run(&run));
    }

    match &run.error {
        Some(err) => {
            terminal_output::note_error(&redact_sensitive_data(&err.summary));
            Ok(ExitCode::FAILURE)
        }
        None => Ok(ExitCode::SUCCESS),
    }
}

async fn serve(app_config: &PlateLensConfig, bind: &str, port: u16, mock: bool) -> Result<()> {
    let pipeline = config::build_pipeline(app_config, mock)?;
    info!(
        provider = pipeline.analyzer().provider_name(),
        "Starting PlateLens API"
    );

    let state = Arc::new(AppState { pipeline });
    let app = api::build_router(state, app_config.max_upload_bytes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("{bind}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "HTTP API listening");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "HTTP server stopped");
        return Err(e.into());
    }
    Ok(())
}
