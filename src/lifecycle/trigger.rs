// Termination triggers and the channel that carries them to the lifecycle manager

use std::fmt;
use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Exit status for a graceful, operator-requested termination.
pub const EXIT_SUCCESS: u8 = 0;
/// Exit status for fault-triggered shutdowns and startup failures.
pub const EXIT_FAILURE: u8 = 1;

/// A condition that starts the shutdown sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// A panic anywhere in the process.
    Fault(String),
    /// A background task finished with an error nobody handled.
    Rejection(String),
    /// SIGTERM.
    Terminate,
    /// SIGINT / Ctrl+C.
    Interrupt,
}

impl Trigger {
    pub fn exit_code(&self) -> u8 {
        match self {
            Trigger::Fault(_) | Trigger::Rejection(_) => EXIT_FAILURE,
            Trigger::Terminate | Trigger::Interrupt => EXIT_SUCCESS,
        }
    }

    /// Emits the log event that identifies this trigger.
    pub fn log(&self) {
        match self {
            Trigger::Fault(detail) => error!("Uncaught fault: {}", detail),
            Trigger::Rejection(detail) => error!("Unhandled rejection: {}", detail),
            Trigger::Terminate => info!("SIGTERM received"),
            Trigger::Interrupt => info!("SIGINT received"),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Fault(_) => f.write_str("uncaught fault"),
            Trigger::Rejection(_) => f.write_str("unhandled rejection"),
            Trigger::Terminate => f.write_str("SIGTERM"),
            Trigger::Interrupt => f.write_str("SIGINT"),
        }
    }
}

/// Creates the trigger channel. Every trigger source holds a [`TriggerSender`];
/// the lifecycle manager drains the [`TriggerReceiver`].
pub fn channel() -> (TriggerSender, TriggerReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sender = TriggerSender { tx };
    let receiver = TriggerReceiver {
        rx,
        keep_open: sender.clone(),
    };
    (sender, receiver)
}

#[derive(Clone, Debug)]
pub struct TriggerSender {
    tx: mpsc::UnboundedSender<Trigger>,
}

impl TriggerSender {
    pub fn send(&self, trigger: Trigger) {
        if self.tx.send(trigger).is_err() {
            debug!("Trigger dropped, lifecycle manager is gone");
        }
    }

    pub fn fault(&self, detail: impl Into<String>) {
        self.send(Trigger::Fault(detail.into()));
    }

    pub fn reject(&self, task: &str, err: &anyhow::Error) {
        self.send(Trigger::Rejection(format!("{task}: {err:#}")));
    }

    /// Spawns `task` on the runtime. If it returns `Err` the error is reported as an
    /// unhandled rejection.
    pub fn supervise<F>(&self, name: &'static str, task: F) -> JoinHandle<()>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let sender: TriggerSender = self.clone();
        tokio::spawn(async move {
            if let Err(err) = task.await {
                sender.reject(name, &err);
            }
        })
    }
}

#[derive(Debug)]
pub struct TriggerReceiver {
    rx: mpsc::UnboundedReceiver<Trigger>,
    // Holding a sender means `recv` never observes a closed channel.
    keep_open: TriggerSender,
}

impl TriggerReceiver {
    /// Waits for the next trigger.
    pub async fn recv(&mut self) -> Trigger {
        match self.rx.recv().await {
            Some(trigger) => trigger,
            None => std::future::pending().await,
        }
    }

    pub fn sender(&self) -> TriggerSender {
        self.keep_open.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_exit_cleanly_and_faults_do_not() {
        assert_eq!(Trigger::Terminate.exit_code(), EXIT_SUCCESS);
        assert_eq!(Trigger::Interrupt.exit_code(), EXIT_SUCCESS);
        assert_eq!(Trigger::Fault("boom".into()).exit_code(), EXIT_FAILURE);
        assert_eq!(Trigger::Rejection("boom".into()).exit_code(), EXIT_FAILURE);
    }

    #[tokio::test]
    async fn triggers_arrive_in_send_order() {
        let (sender, mut receiver) = channel();
        sender.send(Trigger::Interrupt);
        receiver.sender().fault("index out of bounds");

        assert_eq!(receiver.recv().await, Trigger::Interrupt);
        assert_eq!(receiver.recv().await, Trigger::Fault("index out of bounds".into()));
    }

    #[tokio::test]
    async fn failed_supervised_task_is_reported_as_rejection() {
        let (sender, mut receiver) = channel();

        sender
            .supervise("cache warmer", async { Err::<(), _>(anyhow::anyhow!("redis unreachable")) })
            .await
            .unwrap();

        assert_eq!(
            receiver.recv().await,
            Trigger::Rejection("cache warmer: redis unreachable".into())
        );
    }

    #[tokio::test]
    async fn successful_supervised_task_reports_nothing() {
        let (sender, mut receiver) = channel();

        sender.supervise("noop", async { Ok::<(), anyhow::Error>(()) }).await.unwrap();
        sender.send(Trigger::Terminate);

        assert_eq!(receiver.recv().await, Trigger::Terminate);
    }
}
