use clap::{Parser, Subcommand};
use std::fs;
use std::process::ExitCode;
use std::sync::Arc;

use jumptrace::config::Config;
use jumptrace::metrics::{self, JumpReport};
use jumptrace::store::Store;
use jumptrace::{decoder, detector, pipeline, web};

#[derive(Parser)]
#[command(name = "jumptrace")]
#[command(about = "Skydive flight log processing and formation replay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a TLOG file and print a summary
    Decode { file: String },
    /// Decode a TLOG file and print its jump report as JSON
    Report { file: String },
    /// Run the processing pipeline and HTTP API
    Serve {
        #[arg(long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Decode { file } => decode(&file),
        Commands::Report { file } => report(&file),
        Commands::Serve { config } => serve(config.as_deref()).await,
    }
}

fn decode(path: &str) -> ExitCode {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match decoder::decode(&bytes) {
        Ok(log) => {
            println!(
                "Log is valid: {} samples, {:.1} Hz, {:.1} s, GPS: {}",
                log.samples.len(),
                log.sample_rate_hz,
                log.duration_sec,
                if log.has_gps { "yes" } else { "no" }
            );
            if log.dropped_frames > 0 {
                println!("  {} out-of-order frame(s) dropped", log.dropped_frames);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Decode error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn report(path: &str) -> ExitCode {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error reading file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = Config::default();
    let report = match decoder::decode(&bytes) {
        Ok(log) => {
            let events = detector::detect(&log, &config.detector);
            JumpReport::from_metrics(&log, &metrics::compute(&events))
        }
        Err(e) => {
            eprintln!("Decode error: {}", e);
            JumpReport::malformed()
        }
    };

    match serde_json::to_string_pretty(&report) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Serialization error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn serve(config_path: Option<&str>) -> ExitCode {
    let config = match config_path {
        Some(path) => match Config::from_file(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Config error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };
    let config = Arc::new(config);
    let store = Arc::new(Store::new());

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel();
    let worker = tokio::spawn(pipeline::run(
        store.clone(),
        (*config).clone(),
        stop_rx,
    ));

    let result = web::run_server(config, store).await;

    let _ = stop_tx.send(());
    let _ = worker.await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
