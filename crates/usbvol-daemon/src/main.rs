//! usbvold entry point.
//!
//! Wires the knob, the HQPlayer session and the volume controller together,
//! then runs the event loop until SIGINT or SIGTERM.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()          -- /etc/default/usbvol, defaults if absent
//!  └─ open_native_knob()     -- locate + open the evdev node (fatal on failure)
//!  └─ HqpSession::spawn()    -- TCP session actor
//!  └─ VolumeController::connect()
//!  └─ event_loop::run()
//!       ├─ poll tick       -> KeySource::drain() -> handle_keys()
//!       ├─ SessionEvent    -> handle_session_event()
//!       └─ reconnect timer -> reconnect_now()
//! ```
//!
//! Only startup failures end the process with a non-zero status; once the
//! loop runs, device and network errors are logged and survived.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use usbvol_daemon::application::control_volume::{RemoteEndpoint, VolumeController};
use usbvol_daemon::application::event_loop;
use usbvol_daemon::infrastructure::input_device::open_native_knob;
use usbvol_daemon::infrastructure::remote::{HqpSession, DEFAULT_CONNECT_TIMEOUT};
use usbvol_daemon::infrastructure::storage::config::{load_config, DaemonConfig, DEFAULT_CONFIG_PATH};

/// USB volume knob control for HQPlayer Embedded.
#[derive(Debug, Parser)]
#[command(name = "usbvold", version, about)]
struct Cli {
    /// Configuration file (KEY=VALUE lines).
    #[arg(long, env = "USBVOL_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// HQPlayer control host.
    #[arg(long, env = "USBVOL_HOST", default_value = "localhost")]
    host: String,

    /// HQPlayer control port.
    #[arg(long, env = "USBVOL_PORT", default_value_t = 4321)]
    port: u16,

    /// Knob polling period in milliseconds.
    #[arg(
        long,
        env = "USBVOL_POLL_INTERVAL_MS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    poll_interval_ms: u64,

    /// Delay before retrying a failed control connection, in seconds.
    #[arg(long, env = "USBVOL_RECONNECT_DELAY_SECS", default_value_t = 5)]
    reconnect_delay_secs: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("usbvold {} starting", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli.config).unwrap_or_else(|e| {
        warn!("{e}; using defaults");
        DaemonConfig::default()
    });

    // ── Knob ──────────────────────────────────────────────────────────────────
    let identity = config.identity();
    let (device, mut source) = open_native_knob(identity)
        .with_context(|| format!("could not set up the volume knob ({identity})"))?;
    info!("listening for knob events on {}", device.path.display());

    // ── Player session ────────────────────────────────────────────────────────
    let (session, mut events) = HqpSession::spawn(DEFAULT_CONNECT_TIMEOUT);
    let endpoint = RemoteEndpoint {
        host: cli.host,
        port: cli.port,
    };
    let mut controller = VolumeController::new(
        &config.volume,
        Arc::new(session),
        endpoint,
        Duration::from_secs(cli.reconnect_delay_secs),
    );
    controller.connect();

    // ── Run ───────────────────────────────────────────────────────────────────
    event_loop::run(
        &mut controller,
        source.as_mut(),
        &mut events,
        Duration::from_millis(cli.poll_interval_ms),
        shutdown_signal(),
    )
    .await;

    info!("usbvold stopped");
    Ok(())
}

/// Completes on SIGINT, or on SIGTERM where available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("could not listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("could not listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
