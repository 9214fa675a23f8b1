//! Process-wide Ctrl-C handling.
//!
//! [`install`] replaces the default SIGINT behaviour once, at start-up, and
//! counts presses. Waits select on [`interrupted`] to stop early; `main`
//! races the whole command against [`abandoned`] so a press that lands
//! outside any wait still ends the process after cleanup.

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;

/// How long a command may keep running after the first Ctrl-C
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

lazy_static! {
    static ref PRESSES: watch::Sender<u32> = watch::channel(0).0;
}

/// Register the Ctrl-C handler. Must run inside the tokio runtime; the
/// handler is in place when this returns.
pub fn install() -> Result<()> {
    #[cfg(unix)]
    let mut presses =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())
            .context("Failed to install Ctrl-C handler")?;
    #[cfg(windows)]
    let mut presses =
        tokio::signal::windows::ctrl_c().context("Failed to install Ctrl-C handler")?;

    tokio::spawn(async move {
        while presses.recv().await.is_some() {
            record_press();
        }
    });
    Ok(())
}

fn record_press() {
    PRESSES.send_modify(|count| *count += 1);
    if *PRESSES.borrow() == 1 {
        warn!("Interrupted; cleaning up (press Ctrl-C again to quit now)");
    }
}

pub fn is_interrupted() -> bool {
    *PRESSES.borrow() > 0
}

async fn presses_reach(count: u32) {
    let mut rx = PRESSES.subscribe();
    // The sender is static, so the channel never closes
    let _ = rx.wait_for(|presses| *presses >= count).await;
}

/// Resolves once Ctrl-C has been pressed, immediately if it already was
pub async fn interrupted() {
    presses_reach(1).await
}

/// Resolves when the running command should be dropped: a second Ctrl-C,
/// or [`GRACE_PERIOD`] after the first
pub async fn abandoned() {
    interrupted().await;
    tokio::select! {
        _ = presses_reach(2) => {}
        _ = tokio::time::sleep(GRACE_PERIOD) => {}
    }
}
