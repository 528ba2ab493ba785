use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use obd_fetch::app::App;
use obd_fetch::config::Settings;
use obd_fetch::driver;
use obd_fetch::error::ObdError;
use obd_fetch::obd::ObdHttpClient;

/// Reads builders.json from the current directory and mirrors every account
/// into Builder/, Umbrella/ and PDO/. Rerun at any time to resume.
#[derive(Parser)]
#[command(name = "obd-fetch")]
#[command(version, about, long_about = None)]
struct Cli {}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<ObdError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ObdError) -> u8 {
    match error {
        ObdError::InputRead(_) | ObdError::InputParse(_) => 2,
        ObdError::RetriesExhausted { .. } => 3,
        ObdError::Interrupted => 130,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let _cli = Cli::parse();
    let settings = Settings::default();

    let interrupt = Arc::new(AtomicBool::new(false));
    install_interrupt_handler(Arc::clone(&interrupt));

    let client = ObdHttpClient::new(&settings)?;
    let app = App::new(settings, client);
    let summary = driver::run(&app, &interrupt, |delay| {
        interruptible_sleep(delay, &interrupt)
    })?;
    info!(
        passes = summary.passes,
        calls = summary.api_calls,
        "all accounts cached"
    );
    Ok(())
}

/// First Ctrl+C/SIGTERM stops at the next account boundary; a second one exits at once.
fn install_interrupt_handler(flag: Arc<AtomicBool>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                warn!("failed to start signal listener: {err}");
                return;
            }
        };
        runtime.block_on(shutdown_signal());
        warn!("interrupt received; stopping after the current account");
        flag.store(true, Ordering::SeqCst);
        runtime.block_on(shutdown_signal());
        std::process::exit(130);
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

fn interruptible_sleep(delay: Duration, interrupt: &AtomicBool) {
    let deadline = Instant::now() + delay;
    while !interrupt.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(Duration::from_millis(100)));
    }
}
