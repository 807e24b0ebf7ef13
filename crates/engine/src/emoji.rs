//! Cosmetic emoji refresher.
//!
//! An explicitly owned background task with its own lifecycle: started with
//! a storage handle and an interval, stopped by awaiting [`EmojiRefresher::stop`].
//! It repaints the per-status glyph column through a narrow single-column
//! write and never participates in the engine's transition transactions.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use fleetline_core::DispatchStatus;
use fleetline_storage::DispatchStorage;

/// The glyph painted next to each status on the board.
pub fn status_emoji(status: DispatchStatus) -> &'static str {
    match status {
        DispatchStatus::Ready => "✅",
        DispatchStatus::WillBeReady => "🕓",
        DispatchStatus::ReadyAtHome => "🏠",
        DispatchStatus::AtHome => "🛌",
        DispatchStatus::LetUsKnow => "❓",
        DispatchStatus::Covered => "📦",
        DispatchStatus::AtPu => "📍",
        DispatchStatus::Eta => "🚚",
        DispatchStatus::EtaWillBeLate => "⏰",
        DispatchStatus::AtDel => "🏁",
        DispatchStatus::TruckIssues => "🔧",
    }
}

/// Owned handle to the background refresh task.
///
/// Dropping the handle without calling [`stop`](Self::stop) also terminates
/// the task (the shutdown channel closes), but `stop` additionally awaits
/// task exit so shutdown is deterministic.
pub struct EmojiRefresher {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl EmojiRefresher {
    /// Spawn the refresher. The first repaint runs immediately, then once
    /// per `interval`.
    pub fn start<S: DispatchStorage>(storage: Arc<S>, interval: Duration) -> Self {
        let (shutdown, mut watcher) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        match storage.refresh_emojis(status_emoji).await {
                            Ok(rows) => tracing::debug!(rows, "emoji refresh complete"),
                            Err(e) => tracing::warn!(error = %e, "emoji refresh failed"),
                        }
                    }
                    _ = watcher.changed() => return,
                }
            }
        });
        EmojiRefresher { shutdown, handle }
    }

    /// Signal the task to stop and wait for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_status_has_a_glyph() {
        for status in [
            DispatchStatus::Ready,
            DispatchStatus::WillBeReady,
            DispatchStatus::ReadyAtHome,
            DispatchStatus::AtHome,
            DispatchStatus::LetUsKnow,
            DispatchStatus::Covered,
            DispatchStatus::AtPu,
            DispatchStatus::Eta,
            DispatchStatus::EtaWillBeLate,
            DispatchStatus::AtDel,
            DispatchStatus::TruckIssues,
        ] {
            assert!(!status_emoji(status).is_empty());
        }
    }
}
