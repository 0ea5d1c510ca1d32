use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    Terminate,
    Interrupt,
}

/// Wait for SIGINT (Ctrl+C) or SIGTERM
#[cfg(unix)]
pub async fn wait_for_signal() -> std::io::Result<SignalType> {
    let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    tokio::select! {
        res = signal::ctrl_c() => {
            res?;
            debug!("Received SIGINT");
            Ok(SignalType::Interrupt)
        }
        _ = sigterm.recv() => {
            debug!("Received SIGTERM");
            Ok(SignalType::Terminate)
        }
    }
}

/// Wait for Ctrl+C
#[cfg(not(unix))]
pub async fn wait_for_signal() -> std::io::Result<SignalType> {
    signal::ctrl_c().await?;
    debug!("Received SIGINT");
    Ok(SignalType::Interrupt)
}

/// Cancel `token` on the first interrupt or terminate signal.
///
/// The task also ends, without cancelling, once the token is cancelled by
/// someone else.
pub fn spawn_listener(token: CancellationToken) -> JoinHandle<Option<SignalType>> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => None,
            res = wait_for_signal() => match res {
                Ok(signal) => {
                    println!("\nShutting down...");
                    info!("Received {:?}, shutting down", signal);
                    token.cancel();
                    Some(signal)
                }
                Err(e) => {
                    error!("Failed to install signal handler: {}", e);
                    None
                }
            },
        }
    })
}
