// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Channel pair connecting a discovery session to its connection driver.
//!
//! The session owns [`Transport`]: it reads parsed events and writes
//! commands. The driver (or a test) owns the matching [`TransportPeer`].
//!
//! Commands travel over an unbounded channel so a session handler never
//! waits on the socket; events are bounded so a slow session applies
//! backpressure to the reader.

use super::command::OutboundCommand;
use super::event::InboundEvent;
use super::SessionError;
use tokio::sync::mpsc;

/// Default capacity of the inbound event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Session side of the transport.
pub struct Transport {
    events: mpsc::Receiver<InboundEvent>,
    commands: mpsc::UnboundedSender<OutboundCommand>,
}

/// Driver side of the transport.
pub struct TransportPeer {
    pub events: mpsc::Sender<InboundEvent>,
    pub commands: mpsc::UnboundedReceiver<OutboundCommand>,
}

/// Create a connected transport pair.
pub fn channel(event_capacity: usize) -> (Transport, TransportPeer) {
    let (event_tx, event_rx) = mpsc::channel(event_capacity);
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    (
        Transport {
            events: event_rx,
            commands: command_tx,
        },
        TransportPeer {
            events: event_tx,
            commands: command_rx,
        },
    )
}

impl Transport {
    /// Next inbound event, or `None` once the driver has gone away.
    pub async fn next_event(&mut self) -> Option<InboundEvent> {
        self.events.recv().await
    }

    /// Queue a command for the driver.
    pub fn send(&self, command: OutboundCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|e| SessionError::CommandChannelClosed(e.0.to_string()))
    }
}

impl TransportPeer {
    /// Deliver an event to the session. Returns `false` if the session ended.
    pub async fn deliver(&self, event: InboundEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    /// Next command from the session, or `None` once it has ended.
    pub async fn next_command(&mut self) -> Option<OutboundCommand> {
        self.commands.recv().await
    }

    /// Drain every command already queued, without waiting.
    pub fn drain_commands(&mut self) -> Vec<OutboundCommand> {
        let mut out = Vec::new();
        while let Ok(command) = self.commands.try_recv() {
            out.push(command);
        }
        out
    }
}
