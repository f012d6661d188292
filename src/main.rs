//! Drainage Monitoring Service - Main Daemon
//!
//! A client-side daemon that continuously:
//! 1. Polls the drainage sensor device every few seconds
//! 2. Evaluates water level and obstruction distance against thresholds
//! 3. Raises in-app alerts and push notifications on overflow or blockage
//! 4. Optionally serves the latest status over HTTP
//!
//! Usage:
//!   cargo run --release                         # Poll with drainmon.toml / defaults
//!   cargo run --release -- --endpoint 8080      # Also serve GET /status on port 8080
//!   cargo run --release -- --config other.toml  # Use another configuration file
//!   cargo run --release -- --log-notifications  # Deliver notifications to the log
//!
//! Environment:
//!   DRAINMON_HOST, DRAINMON_PORT  - device address overrides
//!   DRAINMON_POLL_SECS            - poll interval override
//!   DRAINMON_PUSH_TOKEN           - Expo push token for this device
//!   RUST_LOG                      - log filter (default: info)

use drainmon_service::alert::dispatch::AlertDispatcher;
use drainmon_service::config::{DEFAULT_CONFIG_PATH, MonitorConfig};
use drainmon_service::daemon::PollScheduler;
use drainmon_service::endpoint::{self, DisplaySink, LogSink, SinkSet, StatusBoard};
use drainmon_service::ingest::device::HttpDeviceClient;
use drainmon_service::logging;
use drainmon_service::monitor::Pipeline;
use drainmon_service::notify::expo::ExpoPushChannel;
use drainmon_service::notify::{self, ConfiguredPermission, LogChannel, NotificationChannel, PushSlot};
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

struct Args {
    config_path: PathBuf,
    endpoint_port: Option<u16>,
    log_notifications: bool,
}

fn parse_args() -> Result<Args, String> {
    let args: Vec<String> = env::args().collect();
    let mut parsed = Args {
        config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        endpoint_port: None,
        log_notifications: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--endpoint" => {
                let port = args.get(i + 1).ok_or("--endpoint requires a port number")?;
                parsed.endpoint_port = Some(port.parse().map_err(|_| format!("invalid port: {}", port))?);
                i += 2;
            }
            "--config" => {
                let path = args.get(i + 1).ok_or("--config requires a path")?;
                parsed.config_path = PathBuf::from(path);
                i += 2;
            }
            "--log-notifications" => {
                parsed.log_notifications = true;
                i += 1;
            }
            other => {
                return Err(format!(
                    "Unknown argument: {}\nUsage: {} [--config PATH] [--endpoint PORT] [--log-notifications]",
                    other, args[0]
                ));
            }
        }
    }

    Ok(parsed)
}

fn main() {
    println!("💧 Drainage Monitoring Service");
    println!("==============================\n");

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    logging::init_logging("info");

    let config = match MonitorConfig::load_with_env(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ {}\n", e);
            std::process::exit(1);
        }
    };

    let device = HttpDeviceClient::from_config(&config.device);
    info!(url = device.url(), "device endpoint");

    // Display sinks: console always, HTTP status board when requested
    let board = StatusBoard::new();
    let mut sinks: Vec<Arc<dyn DisplaySink>> = vec![Arc::new(LogSink)];
    if args.endpoint_port.is_some() {
        sinks.push(Arc::new(board.clone()));
    }

    // Push permission is acquired once, in the background; polling starts
    // without waiting for it.
    let push = PushSlot::new();
    if args.log_notifications {
        push.install(Arc::new(LogChannel));
    } else {
        let push_url = config.alerts.push_url.clone();
        let _ = notify::acquire_push_channel(
            ConfiguredPermission::new(config.alerts.push_token.clone()),
            push.clone(),
            move |token| -> Arc<dyn NotificationChannel> { Arc::new(ExpoPushChannel::with_url(token, push_url)) },
        );
    }

    if let Some(port) = args.endpoint_port {
        let endpoint_board = board.clone();
        std::thread::spawn(move || {
            if let Err(e) = endpoint::start_endpoint_server(port, endpoint_board) {
                error!(error = %e, "endpoint server error");
            }
        });
        println!("🚀 Status endpoint on http://0.0.0.0:{}/status\n", port);
    }

    let pipeline = Arc::new(Pipeline::new(
        Arc::new(device),
        config.evaluator(),
        AlertDispatcher::new(config.alerts.mode),
        Arc::new(SinkSet::new(sinks)),
        push,
    ));

    println!("🔄 Starting poll loop...");
    println!("   Poll interval: {} seconds", config.polling.interval_secs);
    println!("   Press Ctrl+C to stop\n");

    match PollScheduler::new(pipeline, config.scheduler_config()).start() {
        Ok(handle) => handle.wait(),
        Err(e) => {
            eprintln!("\n❌ Failed to start scheduler: {}", e);
            std::process::exit(1);
        }
    }
}
