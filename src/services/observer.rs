//! Result observers.

use anyhow::anyhow;
use tokio::sync::mpsc;

use crate::models::PatrolResult;

/// Receives each website's result as soon as it is produced.
///
/// Called once per website per `execute`, in website order. Errors and
/// panics are logged by the engine and never reach the caller of `execute`.
pub trait ResultObserver: Send + Sync {
    fn on_result(&self, result: &PatrolResult) -> anyhow::Result<()>;
}

impl<F> ResultObserver for F
where
    F: Fn(&PatrolResult) -> anyhow::Result<()> + Send + Sync,
{
    fn on_result(&self, result: &PatrolResult) -> anyhow::Result<()> {
        self(result)
    }
}

/// Forwards results into an unbounded channel for a consumer task.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<PatrolResult>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<PatrolResult>) -> Self {
        Self { tx }
    }

    /// An observer together with the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PatrolResult>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl ResultObserver for ChannelObserver {
    fn on_result(&self, result: &PatrolResult) -> anyhow::Result<()> {
        self.tx
            .send(result.clone())
            .map_err(|_| anyhow!("result channel closed"))
    }
}
