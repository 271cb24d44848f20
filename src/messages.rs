//! Message types for the control actor.
//!
//! Commands from the dispatcher and frames from the event channel share one mpsc
//! queue, so the controller sees them in exactly the order they were sent.
//! Requests that need an answer carry a oneshot sender.
//!
//! # Message Flow
//!
//! ```text
//! Dispatcher / event source            ControlActor
//! -------------------------            ------------
//! 1. Create message with oneshot
//! 2. Send via mpsc channel     ------>
//!                                      3. Receive message
//!                                      4. Apply to controller
//!                                      5. Send acknowledgement
//! 6. Await oneshot receiver    <------
//! ```
//!
//! Each request variant has a helper that returns the message and its receiver:
//!
//! ```rust
//! use dark_hole_control::command::Command;
//! use dark_hole_control::messages::ControlMessage;
//!
//! let (msg, rx) = ControlMessage::command(Command::Init);
//! // tx.send(msg).await?;
//! // let ack = rx.await??;
//! ```

use crate::command::Command;
use crate::error::AppResult;
use crate::frame::Frame;
use crate::snapshot::SessionSnapshot;
use tokio::sync::oneshot;

/// Messages accepted by [`ControlActor`](crate::control_actor::ControlActor).
#[derive(Debug)]
pub enum ControlMessage {
    /// Run a dispatcher command.
    ///
    /// # Response
    ///
    /// The operator acknowledgement, or the error that rejected the command.
    Command {
        /// Parsed command
        command: Command,
        /// Response channel for the acknowledgement
        response: oneshot::Sender<AppResult<String>>,
    },

    /// A decoded frame from the event channel. Fire-and-forget.
    Frame(Frame),

    /// Capture the controller state.
    Snapshot {
        /// Response channel for the snapshot
        response: oneshot::Sender<SessionSnapshot>,
    },

    /// Stop the actor after everything queued before it.
    Shutdown {
        /// Response channel (acknowledges shutdown)
        response: oneshot::Sender<()>,
    },
}

impl ControlMessage {
    /// Helper to create a Command message
    pub fn command(command: Command) -> (Self, oneshot::Receiver<AppResult<String>>) {
        let (tx, rx) = oneshot::channel();
        (
            Self::Command {
                command,
                response: tx,
            },
            rx,
        )
    }

    /// Helper to create a Snapshot message
    pub fn snapshot() -> (Self, oneshot::Receiver<SessionSnapshot>) {
        let (tx, rx) = oneshot::channel();
        (Self::Snapshot { response: tx }, rx)
    }

    /// Helper to create a Shutdown message
    pub fn shutdown() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self::Shutdown { response: tx }, rx)
    }
}
