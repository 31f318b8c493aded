//! yadevices - Entry Point
//!
//! Bridges the Yandex smart-home cloud into a local object graph: logs in with
//! a QR code, mirrors devices and stations, polls device state and speaks
//! through stations.

use std::collections::HashMap;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use tracing::{error, info};

use yadevices::app::options::AppOptions;
use yadevices::app::run::run;
use yadevices::app::state::AppState;
use yadevices::authn::qr_login::QrLoginOutcome;
use yadevices::logs::{init_logging, LogOptions};
use yadevices::objects::MemoryObjectGraph;
use yadevices::storage::layout::StorageLayout;
use yadevices::storage::settings::{load_settings, save_settings};
use yadevices::utils::version_info;

/// How long an unscanned QR code is polled
const LOGIN_ATTEMPTS: usize = 60;
const LOGIN_POLL_INTERVAL: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut cli_args: HashMap<String, String> = HashMap::new();

    for arg in args.iter().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            // Handle --key=value format
            let clean_key = key.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), value.to_string());
        } else if arg.starts_with("--") {
            // Handle standalone flags like --version
            let clean_key = arg.trim_start_matches('-');
            cli_args.insert(clean_key.to_string(), "true".to_string());
        }
    }

    // Print version and exit
    let version = version_info();
    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version) {
            Ok(out) => println!("{out}"),
            Err(_) => println!("{}", version.version),
        }
        return ExitCode::SUCCESS;
    }

    let layout = match cli_args.get("base-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };

    // Retrieve the settings file, writing the defaults on first start
    let settings_file = layout.settings_file();
    let settings = match load_settings(&settings_file).await {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Unable to read settings file: {e}");
            return ExitCode::FAILURE;
        }
    };
    if !settings_file.exists().await {
        if let Err(e) = save_settings(&settings_file, &settings).await {
            eprintln!("Unable to write default settings: {e}");
        }
    }

    // Initialize logging
    let log_options = LogOptions {
        log_level: settings.log_level,
        ..Default::default()
    };
    if let Err(e) = init_logging(log_options) {
        println!("Failed to initialize logging: {e}");
    }

    let options = AppOptions::from_settings(&settings, layout);
    let graph = Arc::new(MemoryObjectGraph::new());

    // Run the bridge unless a one-shot command was given
    let one_shot = ["login", "reset", "update", "stations", "say"]
        .iter()
        .any(|key| cli_args.contains_key(*key));
    if !one_shot {
        info!("Running yadevices {} with options: {:?}", version.version, options);
        return match run(options, graph, await_shutdown_signal()).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Failed to run the bridge: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let state = match AppState::init(&options, graph).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize: {e}");
            return ExitCode::FAILURE;
        }
    };

    let ok = if cli_args.contains_key("reset") {
        reset(&state).await
    } else if cli_args.contains_key("login") {
        login(&state).await
    } else if cli_args.contains_key("update") {
        update(&state).await
    } else if cli_args.contains_key("stations") {
        stations(&state).await
    } else {
        let message = cli_args.get("say").cloned().unwrap_or_default();
        let level = cli_args
            .get("level")
            .and_then(|l| l.parse::<i64>().ok())
            .unwrap_or(0);
        say(&state, &message, level).await
    };

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn reset(state: &AppState) -> bool {
    match state.login.reset().await {
        Ok(()) => {
            println!("{}", "Session removed".yellow());
            true
        }
        Err(e) => {
            println!("{} {e}", "Unable to remove session:".red());
            false
        }
    }
}

async fn login(state: &AppState) -> bool {
    if state.login.check_authorized().await {
        println!("{}", "Already authorized".green());
        return true;
    }

    let mut challenge = match state.login.start().await {
        QrLoginOutcome::AwaitingScan(challenge) => challenge,
        QrLoginOutcome::Failed(message) => {
            println!("{}", message.red());
            return false;
        }
        other => {
            println!("{} {other:?}", "Unexpected login state:".red());
            return false;
        }
    };

    println!("Open this link and scan the QR code with the Yandex app:");
    println!("  {}", challenge.qr_url.cyan().underline());

    for _ in 0..LOGIN_ATTEMPTS {
        tokio::time::sleep(LOGIN_POLL_INTERVAL).await;
        match state.login.confirm(&challenge).await {
            QrLoginOutcome::Authorized => {
                println!("{}", "Authorized".green().bold());
                return true;
            }
            QrLoginOutcome::Rejected => {
                println!("{}", "Login confirmed but the session was rejected".red());
                return false;
            }
            QrLoginOutcome::Failed(message) => {
                println!("{}", message.red());
                return false;
            }
            QrLoginOutcome::Pending { challenge: next, .. }
            | QrLoginOutcome::AwaitingScan(next) => {
                challenge = next;
            }
        }
    }

    println!("{}", "QR code was not scanned in time".yellow());
    false
}

async fn update(state: &AppState) -> bool {
    match state.directory.update_devices().await {
        Ok(report) => {
            println!(
                "{} devices updated, {} stations linked",
                report.devices.to_string().green(),
                report.stations_linked
            );
            true
        }
        Err(e) => {
            println!("{} {e}", "Device update failed:".red());
            false
        }
    }
}

async fn stations(state: &AppState) -> bool {
    match state.stations.refresh_stations().await {
        Ok(report) => {
            println!(
                "Scenarios: {} created, {} adopted, {} failed",
                report.created.to_string().green(),
                report.adopted,
                report.failed.to_string().red()
            );
            report.failed == 0
        }
        Err(e) => {
            println!("{} {e}", "Station refresh failed:".red());
            false
        }
    }
}

async fn say(state: &AppState, message: &str, level: i64) -> bool {
    if message.trim().is_empty() {
        println!("{}", "Nothing to say".yellow());
        return false;
    }
    let delivered = state.commands.say(message, level).await;
    println!("Delivered to {delivered} station(s)");
    delivered > 0
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("Failed to listen for SIGTERM");
        let mut sigint = signal(SignalKind::interrupt()).expect("Failed to listen for SIGINT");

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = sigint.recv() => {
                info!("SIGINT received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
        info!("Ctrl+C received, shutting down...");
    }
}
