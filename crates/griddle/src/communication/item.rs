use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::error::PredictError;

/// # Item
///
/// The caller-visible completion handle for a submitted request.
///
/// `Item` wraps the receiving half of a oneshot channel and resolves exactly
/// once, to the request's result or to a [`PredictError`]. If the sending
/// half disappears without a verdict (abrupt teardown rather than graceful
/// shutdown), the handle resolves to [`PredictError::Cancelled`] instead of
/// hanging forever.
pub struct Item<T> {
    /// The underlying channel receiver
    receiver: oneshot::Receiver<Result<T, PredictError>>,
}

impl<T> Item<T> {
    /// Creates a new `Item` from a Tokio oneshot channel receiver.
    pub(crate) fn new(receiver: oneshot::Receiver<Result<T, PredictError>>) -> Self {
        Self { receiver }
    }
}

impl<T> Future for Item<T> {
    type Output = Result<T, PredictError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().receiver)
            .poll(cx)
            .map(|res| match res {
                Ok(outcome) => outcome,
                Err(_) => Err(PredictError::Cancelled),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn item_resolves_to_sent_value() {
        let (tx, rx) = oneshot::channel();
        let item: Item<u32> = Item::new(rx);

        tx.send(Ok(7)).unwrap();
        assert_eq!(item.await.unwrap(), 7);
    }

    #[tokio::test]
    async fn item_surfaces_sent_error() {
        let (tx, rx) = oneshot::channel();
        let item: Item<u32> = Item::new(rx);

        tx.send(Err(PredictError::Cancelled)).unwrap();
        assert!(matches!(item.await, Err(PredictError::Cancelled)));
    }

    #[tokio::test]
    async fn dropped_sender_resolves_to_cancelled() {
        let (tx, rx) = oneshot::channel::<Result<u32, PredictError>>();
        let item = Item::new(rx);

        drop(tx);
        assert!(matches!(item.await, Err(PredictError::Cancelled)));
    }
}
