use super::{errors::SplitError, result::SplitResult};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};
use futures::channel::oneshot;
use futures::executor::block_on;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Handle to an in-flight `split` call.
///
/// Resolves once every chunk has run. Offers a blocking `wait`, a
/// non-blocking `is_finished` probe, and a `Future` impl for callers that
/// already live inside an async executor.
pub struct JoinHandle {
    receiver: oneshot::Receiver<SplitResult>,
    finished: Option<SplitResult>,
}

impl JoinHandle {
    pub(crate) fn new(receiver: oneshot::Receiver<SplitResult>) -> Self {
        Self {
            receiver,
            finished: None,
        }
    }

    /// Block the calling thread until every chunk has finished.
    pub fn wait(self) -> SplitResult {
        let JoinHandle { receiver, finished } = self;
        if let Some(result) = finished {
            return result;
        }
        block_on(receiver).unwrap_or(Err(SplitError::ChannelClosed))
    }

    /// Non-blocking completion probe.
    pub fn is_finished(&mut self) -> bool {
        if self.finished.is_some() {
            return true;
        }
        match self.receiver.try_recv() {
            Ok(Some(result)) => {
                self.finished = Some(result);
                true
            }
            Ok(None) => false,
            Err(_) => {
                self.finished = Some(Err(SplitError::ChannelClosed));
                true
            }
        }
    }
}

impl Future for JoinHandle {
    type Output = SplitResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Some(result) = this.finished.take() {
            return Poll::Ready(result);
        }
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(res) => Poll::Ready(res.unwrap_or(Err(SplitError::ChannelClosed))),
            Poll::Pending => Poll::Pending,
        }
    }
}
