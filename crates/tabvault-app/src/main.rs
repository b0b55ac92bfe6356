mod bridge;
mod config;
mod error;
mod host;
mod persistence;
mod runtime;
mod scheduler;

use anyhow::Context;
use log::{info, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use bridge::{encode, parse_line, Outbound};
use config::AppConfig;
use error::AppError;
use persistence::FilePersistence;
use runtime::{wall_clock, AppRuntime, RuntimeHandle, RuntimeMessage};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(error) = run().await {
        eprintln!("tabvault-app: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("configuration failed")?;
    let persistence =
        FilePersistence::open(&config).context("could not open the state directory")?;
    info!(
        "state in {} (sync {})",
        config.state_dir.display(),
        match &config.sync_dir {
            Some(dir) => dir.display().to_string(),
            None => "disabled".to_owned(),
        }
    );

    let (outbound, outbound_rx) = mpsc::unbounded_channel();
    let runtime = AppRuntime::new(persistence, outbound.clone(), wall_clock);
    let handle = runtime.handle();
    let writer = tokio::spawn(write_outbound(outbound_rx));
    let actor = tokio::spawn(runtime.run());

    read_inbound(&handle, outbound)
        .await
        .context("reading the bridge failed")?;
    actor.await.context("runtime task panicked")?;
    writer
        .await
        .context("writer task panicked")?
        .context("writing the bridge failed")?;
    Ok(())
}

/// Feeds stdin lines to the runtime until the bridge closes or says goodbye.
async fn read_inbound(
    handle: &RuntimeHandle,
    outbound: UnboundedSender<Outbound>,
) -> Result<(), AppError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|err| AppError::io("<stdin>", err))?
    {
        if line.trim().is_empty() {
            continue;
        }
        let inbound = match parse_line(&line) {
            Ok(inbound) => inbound,
            Err(err) => {
                warn!("{err}; line skipped");
                continue;
            }
        };
        if !handle.dispatch(inbound, &outbound)? {
            return Ok(());
        }
    }

    info!("bridge closed");
    handle.send(RuntimeMessage::Shutdown)
}

// Exits once the runtime and every pending reply have dropped their senders.
async fn write_outbound(mut outbound: UnboundedReceiver<Outbound>) -> Result<(), AppError> {
    let mut stdout = tokio::io::stdout();
    while let Some(message) = outbound.recv().await {
        let mut line = match encode(&message) {
            Ok(line) => line,
            Err(err) => {
                warn!("{err}");
                continue;
            }
        };
        line.push('\n');
        stdout
            .write_all(line.as_bytes())
            .await
            .map_err(|err| AppError::io("<stdout>", err))?;
        stdout
            .flush()
            .await
            .map_err(|err| AppError::io("<stdout>", err))?;
    }
    Ok(())
}
