//! Registration of the process-level trigger sources.
//!
//! - SIGTERM → [`Trigger::Terminate`]
//! - SIGINT / Ctrl+C → [`Trigger::Interrupt`]
//! - any panic → [`Trigger::Fault`]
//!
//! Unhandled rejections come from [`TriggerSender::supervise`].

use std::any::Any;

use anyhow::{Context, Result};

use super::trigger::{Trigger, TriggerSender};

/// Installs SIGTERM and SIGINT listeners. Must be called from within the runtime.
/// Repeated signals are forwarded as well; the manager acts on the first one only.
#[cfg(unix)]
pub fn install_signal_handlers(sender: &TriggerSender) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    let mut interrupt = signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;

    let sender: TriggerSender = sender.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                Some(()) = terminate.recv() => sender.send(Trigger::Terminate),
                Some(()) = interrupt.recv() => sender.send(Trigger::Interrupt),
                else => break,
            }
        }
    });

    Ok(())
}

#[cfg(not(unix))]
pub fn install_signal_handlers(sender: &TriggerSender) -> Result<()> {
    let sender: TriggerSender = sender.clone();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            sender.send(Trigger::Interrupt);
        }
    });

    Ok(())
}

/// Wraps the process panic hook so that every panic, on any thread, is reported as
/// an uncaught fault. The hook that was installed before still runs first, so panic
/// output keeps reaching stderr after the manager has stopped reading triggers.
pub fn install_panic_hook(sender: TriggerSender) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        previous(info);

        let message: &str = panic_message(info.payload());
        let detail: String = match info.location() {
            Some(location) => format!("{message} at {location}"),
            None => message.to_string(),
        };
        sender.fault(detail);
    }));
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "Box<dyn Any>"
    }
}
