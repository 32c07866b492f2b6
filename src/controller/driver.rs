//! Runs a [`Controller`] on a tokio task.
//!
//! Events arrive over an unbounded channel; timers are served with
//! `sleep_until` on the controller's next deadline. Every effect is applied to
//! the [`Page`] in the order the controller produced it.

use super::{Controller, Page, UiEvent};
use std::fmt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ControllerHandle {
    events: mpsc::UnboundedSender<UiEvent>,
}

impl ControllerHandle {
    pub fn send(&self, event: UiEvent) -> Result<(), DriverClosed> {
        self.events.send(event).map_err(|_| DriverClosed)
    }
}

/// The driver task has stopped and no longer accepts events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverClosed;

impl fmt::Display for DriverClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "controller driver has stopped")
    }
}

impl std::error::Error for DriverClosed {}

/// Spawns the driver. Dropping every handle stops it; the task then hands the
/// controller and page back. Timers still pending at that point are dropped.
pub fn spawn<P>(controller: Controller, page: P) -> (ControllerHandle, JoinHandle<(Controller, P)>)
where
    P: Page + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let task = tokio::spawn(run(controller, page, rx));
    (ControllerHandle { events: tx }, task)
}

async fn run<P: Page>(
    mut controller: Controller,
    mut page: P,
    mut events: mpsc::UnboundedReceiver<UiEvent>,
) -> (Controller, P) {
    loop {
        let deadline = controller.next_deadline();
        let effects = tokio::select! {
            event = events.recv() => match event {
                Some(event) => controller.handle(event, Instant::now().into_std()),
                None => break,
            },
            _ = wait_for(deadline) => controller.advance(Instant::now().into_std()),
        };
        for effect in &effects {
            page.apply(effect);
        }
    }
    debug!(state = %controller.state(), "controller driver stopped");
    (controller, page)
}

async fn wait_for(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => sleep_until(Instant::from_std(deadline)).await,
        None => std::future::pending::<()>().await,
    }
}
