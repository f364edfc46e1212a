//! Tokio bridge for the blocking receive loop.

use loralink_signals::TelemetryDecoder;
use loralink_transport::DeviceStream;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::error;

use crate::receiver::{StopSignal, TelemetryQueue};
use crate::session::DeviceSession;

impl<S: DeviceStream + 'static> DeviceSession<S> {
    /// Run the receive loop on tokio's blocking pool until `token` is cancelled.
    ///
    /// The returned task resolves to the session once the loop has exited.
    /// Must be called from within a tokio runtime.
    pub fn spawn_receiver_async(
        self,
        decoder: TelemetryDecoder,
        queue: TelemetryQueue,
        token: CancellationToken,
    ) -> JoinHandle<DeviceSession<S>> {
        let stop = StopSignal::new();
        let loop_done = token.child_token();

        let watcher_stop = stop.clone();
        let watcher_done = loop_done.clone();
        tokio::spawn(async move {
            // Cancelling the child on loop exit ends this watcher without touching the parent.
            watcher_done.cancelled().await;
            watcher_stop.trigger();
        });

        let mut session = self;
        tokio::task::spawn_blocking(move || {
            if let Err(err) = session.run_receive_loop(&stop, &decoder, &queue) {
                error!(error = %err, "receive loop failed");
            }
            loop_done.cancel();
            session
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use loralink_transport::MemoryStream;

    use super::*;
    use crate::config::SessionConfig;

    #[tokio::test]
    async fn cancellation_stops_loop() {
        let (host, _device) = MemoryStream::pair();
        let session = DeviceSession::with_config(host, SessionConfig::immediate());
        let token = CancellationToken::new();

        let task = session.spawn_receiver_async(
            TelemetryDecoder::default(),
            TelemetryQueue::new(),
            token.clone(),
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        let session = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .unwrap()
            .unwrap();
        // Only the standby request on exit.
        assert_eq!(session.stats().transmitted, 1);
    }
}
