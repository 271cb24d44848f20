//! Control actor: serializes dispatcher commands and frame events.
//!
//! The actor owns the [`DarkHoleController`] while it runs. Everything reaches
//! it through one mpsc queue and is applied strictly in arrival order, so the
//! controller never sees concurrent mutation. [`ControlHandle`] is the cheap,
//! cloneable client side.
//!
//! ```rust,no_run
//! use dark_hole_control::command::Command;
//! use dark_hole_control::config::ObservingBlockKeys;
//! use dark_hole_control::control_actor::spawn;
//! use dark_hole_control::controller::DarkHoleController;
//!
//! # async fn example(keys: ObservingBlockKeys) -> Result<(), Box<dyn std::error::Error>> {
//! let (handle, task) = spawn(DarkHoleController::new(keys), 32);
//! let ack = handle.send(Command::Init).await?;
//! handle.shutdown().await?;
//! let controller = task.await?;
//! # Ok(())
//! # }
//! ```

use crate::command::Command;
use crate::controller::DarkHoleController;
use crate::error::{AppResult, DarkHoleError};
use crate::frame::Frame;
use crate::messages::ControlMessage;
use crate::snapshot::SessionSnapshot;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Owns the controller and applies queued messages to it.
#[derive(Debug)]
pub struct ControlActor {
    controller: DarkHoleController,
}

impl ControlActor {
    /// Wrap a controller.
    pub fn new(controller: DarkHoleController) -> Self {
        Self { controller }
    }

    /// Run until a `Shutdown` message arrives or every sender is dropped.
    ///
    /// Returns the controller so its final state can be inspected or saved.
    pub async fn run(mut self, mut rx: mpsc::Receiver<ControlMessage>) -> DarkHoleController {
        info!("Control actor started");

        while let Some(message) = rx.recv().await {
            match message {
                ControlMessage::Command { command, response } => {
                    let verb = command.verb();
                    let result = self.controller.execute(command);
                    if let Err(e) = &result {
                        warn!(command = verb, error = %e, "Command rejected");
                    }
                    if response.send(result).is_err() {
                        debug!(command = verb, "Requester went away before the acknowledgement");
                    }
                }

                ControlMessage::Frame(frame) => {
                    self.controller.on_frame(frame);
                }

                ControlMessage::Snapshot { response } => {
                    let _ = response.send(self.controller.snapshot());
                }

                ControlMessage::Shutdown { response } => {
                    info!("Control actor shutting down");
                    let _ = response.send(());
                    break;
                }
            }
        }

        info!("Control actor stopped");
        self.controller
    }
}

/// Client side of a running control actor.
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlMessage>,
}

impl ControlHandle {
    /// Wrap the sending half of an actor's queue.
    pub fn new(tx: mpsc::Sender<ControlMessage>) -> Self {
        Self { tx }
    }

    /// Send a command and wait for its acknowledgement.
    pub async fn send(&self, command: Command) -> AppResult<String> {
        let (msg, rx) = ControlMessage::command(command);
        self.tx
            .send(msg)
            .await
            .map_err(|_| DarkHoleError::ActorUnavailable)?;
        rx.await.map_err(|_| DarkHoleError::ActorUnavailable)?
    }

    /// Queue a frame from the event channel.
    ///
    /// A frame whose pixel buffer does not match its shape is refused with
    /// [`DarkHoleError::InvalidFrame`] and never reaches the actor.
    pub async fn deliver_frame(&self, frame: Frame) -> AppResult<()> {
        frame.check_shape()?;
        self.tx
            .send(ControlMessage::Frame(frame))
            .await
            .map_err(|_| DarkHoleError::ActorUnavailable)
    }

    /// Capture the controller state once everything queued so far is applied.
    pub async fn snapshot(&self) -> AppResult<SessionSnapshot> {
        let (msg, rx) = ControlMessage::snapshot();
        self.tx
            .send(msg)
            .await
            .map_err(|_| DarkHoleError::ActorUnavailable)?;
        rx.await.map_err(|_| DarkHoleError::ActorUnavailable)
    }

    /// Ask the actor to stop once everything queued so far is applied.
    pub async fn shutdown(&self) -> AppResult<()> {
        let (msg, rx) = ControlMessage::shutdown();
        self.tx
            .send(msg)
            .await
            .map_err(|_| DarkHoleError::ActorUnavailable)?;
        rx.await.map_err(|_| DarkHoleError::ActorUnavailable)
    }
}

/// Spawn a control actor on the current Tokio runtime.
pub fn spawn(
    controller: DarkHoleController,
    capacity: usize,
) -> (ControlHandle, JoinHandle<DarkHoleController>) {
    let (tx, rx) = mpsc::channel(capacity);
    let task = tokio::spawn(ControlActor::new(controller).run(rx));
    (ControlHandle::new(tx), task)
}
