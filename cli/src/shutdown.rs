//! Signal handling: SIGINT (and SIGTERM on Unix) cancel a shared token.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawn a task that cancels `token` on the first shutdown signal.
pub fn spawn_signal_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match wait_for_signal().await {
            Ok(signal) => {
                tracing::info!(signal, "received shutdown signal");
                token.cancel();
            }
            Err(err) => {
                tracing::error!("error setting up signal handler: {}", err);
            }
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = sigterm.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "Ctrl-C")
}
