//! The consumption loop.

use std::fmt::Display;

use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use workflows::{BrokerError, InboundMessage, MessageHandler};

/// Feeds every delivery from `deliveries` to `handler`, one at a time.
///
/// Each message is handled to completion before the next is pulled, so
/// delivery order is processing order. Cancelling `shutdown` stops the loop
/// between messages and returns `Ok(())`; a message already being handled is
/// finished first. Receive errors are logged and skipped. The stream ending
/// without a shutdown request is reported as [`BrokerError::Consume`].
pub async fn consume<S, M, E>(
    mut deliveries: S,
    handler: &dyn MessageHandler,
    shutdown: &CancellationToken,
) -> Result<(), BrokerError>
where
    S: Stream<Item = Result<M, E>> + Unpin,
    M: InboundMessage,
    E: Display,
{
    let mut processed: u64 = 0;

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                info!(processed, "Shutdown requested, consumer stopped");
                return Ok(());
            }
            next = deliveries.next() => next,
        };

        match next {
            Some(Ok(message)) => {
                handler.handle(&message).await;
                processed += 1;
                debug!(processed, "Message handled");
            }
            Some(Err(e)) => warn!(error = %e, "Failed to receive message"),
            None => {
                return Err(BrokerError::Consume(format!(
                    "delivery stream ended after {processed} messages"
                )))
            }
        }
    }
}
