//! nukmon_service entry point.
//!
//! ```text
//! nukmon_service [serve]          # HTTP dashboard on $PORT (default 3000)
//! nukmon_service evaluate [CSV]   # one cycle, summary JSON on stdout
//! ```
//!
//! Configuration: `NUKMON_CONFIG` (TOML file, default `./nukmon.toml`),
//! `NUKMON_DATA`, `NUKMON_LOG_FILE`, `PORT`. A `.env` file is honoured.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use nukmon_service::alert::notify;
use nukmon_service::config::Config;
use nukmon_service::ingest::geolocate::IpInfoLocator;
use nukmon_service::logging::{self, Component, LogLevel};
use nukmon_service::pipeline::{Dashboard, PlantSource};
use nukmon_service::server::{create_router, AppState};
use nukmon_service::store::{SnapshotStore, DEFAULT_SESSION};

fn main() {
    dotenv::dotenv().ok();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("nukmon_service: {}", e);
            std::process::exit(2);
        }
    };

    logging::init_logger(LogLevel::Info, config.log_file.as_deref(), true);

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        None | Some("serve") => serve(config),
        Some("evaluate") => evaluate_once(config, args.get(1).cloned()),
        Some(other) => {
            eprintln!("unknown command '{}'; expected 'serve' or 'evaluate [CSV]'", other);
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        logging::error(Component::System, None, &e.to_string());
        std::process::exit(1);
    }
}

fn build_dashboard(config: Config) -> Dashboard {
    let locator = IpInfoLocator::from_settings(&config.location);
    let store = Arc::new(SnapshotStore::with_max_sessions(config.server.max_sessions));
    Dashboard::new(config, Box::new(locator), notify::default_notifier(), store)
}

fn evaluate_once(mut config: Config, csv_path: Option<String>) -> Result<(), Box<dyn Error>> {
    if let Some(path) = csv_path {
        config.ingest.data_path = path;
    }
    let dashboard = build_dashboard(config);
    let snapshot = dashboard.evaluate(DEFAULT_SESSION, PlantSource::ConfiguredFile)?;
    println!("{}", serde_json::to_string_pretty(snapshot.as_ref())?);
    Ok(())
}

fn serve(config: Config) -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(run_server(config))
}

async fn run_server(config: Config) -> Result<(), Box<dyn Error>> {
    let port = config.server.port;
    logging::info(Component::System, None, &format!("data file: {}", config.ingest.data_path));
    logging::info(Component::System, None, &format!("map output: {}", config.map.output_dir));
    logging::info(Component::System, None, &format!("session cap: {}", config.server.max_sessions));

    let app = create_router(AppState::new(build_dashboard(config)));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    logging::info(Component::System, None, &format!("listening on {}", addr));

    axum::serve(listener, app).await?;
    Ok(())
}
