use async_stream::stream;
use futures_util::stream::BoxStream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use messenger_types::events::StoreEvent;

/// Turn a broadcast receiver into a stream of the events `select` keeps,
/// preceded by `initial`. The stream ends when the dispatcher is dropped;
/// dropping the stream drops the receiver.
pub fn filtered<T, F>(
    mut receiver: broadcast::Receiver<StoreEvent>,
    initial: Vec<T>,
    select: F,
) -> BoxStream<'static, T>
where
    T: Send + 'static,
    F: Fn(StoreEvent) -> Option<T> + Send + 'static,
{
    Box::pin(stream! {
        for item in initial {
            yield item;
        }

        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Some(item) = select(event) {
                        yield item;
                    }
                }
                Err(RecvError::Lagged(n)) => {
                    warn!("Subscription lagged by {} events", n);
                    continue;
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
