//! Termination signals as cancellation.

use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives a termination signal
///
/// SIGTERM and SIGINT on unix, Ctrl+C elsewhere. If no handler can be
/// installed the token is left alone.
pub fn cancel_on_signal(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            received = wait_for_signal() => {
                if received {
                    tracing::warn!("interrupt received, stopping after cleanup");
                    token.cancel();
                }
            }
            _ = token.cancelled() => {}
        }
    })
}

/// Resolves on the first SIGTERM or SIGINT; false when neither can be watched
#[cfg(unix)]
async fn wait_for_signal() -> bool {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    async fn next(handler: &mut Option<Signal>) {
        match handler {
            Some(handler) => {
                handler.recv().await;
            }
            None => std::future::pending().await,
        }
    }

    let watch = |kind: SignalKind, name: &str| match signal(kind) {
        Ok(handler) => Some(handler),
        Err(e) => {
            tracing::warn!(signal = name, error = %e, "cannot watch signal");
            None
        }
    };
    let mut term = watch(SignalKind::terminate(), "SIGTERM");
    let mut int = watch(SignalKind::interrupt(), "SIGINT");

    if term.is_none() && int.is_none() {
        return tokio::signal::ctrl_c().await.is_ok();
    }

    tokio::select! {
        _ = next(&mut term) => tracing::debug!("SIGTERM received"),
        _ = next(&mut int) => tracing::debug!("SIGINT received"),
    }
    true
}

/// Resolves on Ctrl+C; false when the handler cannot be installed
#[cfg(not(unix))]
async fn wait_for_signal() -> bool {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot watch Ctrl+C");
        return false;
    }
    tracing::debug!("Ctrl+C received");
    true
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn listener_exits_when_token_is_cancelled_elsewhere() {
        let token = CancellationToken::new();
        let handle = cancel_on_signal(token.clone());

        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("listener must stop once the token is cancelled")
            .unwrap();
    }
}
