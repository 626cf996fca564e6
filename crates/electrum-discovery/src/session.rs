// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovery session state machine.
//!
//! A session joins the discovery channel once registration completes,
//! collects the channel roster, queries every member whose name carries the
//! discovery prefix and resolves once every queried member has replied.
//!
//! ```text
//! Idle -> AwaitingHandshake -> Joining -> CollectingRoster
//!      -> QueryingMembers -> Aggregating -> Done
//! ```
//!
//! The session imposes no deadline. A member that never answers keeps the
//! aggregate pending; callers wrap [`DiscoverySession::run`] in a timeout
//! and call [`DiscoveryHandle::stop`] on expiry.

use crate::config::DiscoveryConfig;
use crate::record::PeerRecord;
use futures::future::{join_all, BoxFuture, FutureExt};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

pub mod command;
pub mod event;
pub mod transport;

pub use command::OutboundCommand;
pub use event::{InboundEvent, MetadataReply};
pub use transport::{Transport, TransportPeer};

/// Session errors.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport closed before discovery completed")]
    TransportClosed,

    #[error("command channel closed while sending {0}")]
    CommandChannelClosed(String),

    #[error("pending member query dropped before it resolved")]
    Aborted,

    #[error("session stopped")]
    Stopped,

    #[error("session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Protocol phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingHandshake,
    Joining,
    CollectingRoster,
    QueryingMembers,
    Aggregating,
    Done,
}

type Barrier = BoxFuture<'static, Result<Vec<PeerRecord>, oneshot::error::RecvError>>;

/// One discovery run bound to one transport.
pub struct DiscoverySession {
    channel: String,
    member_prefix: String,
    state: SessionState,
    connected: bool,
    candidates: Vec<String>,
    pending: HashMap<String, oneshot::Sender<PeerRecord>>,
    barrier: Option<Barrier>,
    shutdown: Arc<Notify>,
}

impl DiscoverySession {
    /// Create a session for `channel`, querying members named `member_prefix*`.
    pub fn new(channel: impl Into<String>, member_prefix: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            member_prefix: member_prefix.into(),
            state: SessionState::Idle,
            connected: false,
            candidates: Vec::new(),
            pending: HashMap::new(),
            barrier: None,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Create a session from the channel and prefix in `config`.
    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.channel.clone(), config.member_prefix.clone())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Members kept from the roster so far, in receipt order.
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Member queries still awaiting a reply.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Spawn the session and return a handle to its result.
    pub fn start(self, transport: Transport) -> DiscoveryHandle {
        let shutdown = self.shutdown.clone();
        let task = tokio::spawn(self.run(transport));
        DiscoveryHandle { shutdown, task }
    }

    /// Drive the protocol until every queried member has replied.
    pub async fn run(mut self, mut transport: Transport) -> Result<Vec<PeerRecord>, SessionError> {
        self.transition(SessionState::AwaitingHandshake);
        let shutdown = self.shutdown.clone();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.notified() => {
                    debug!("Stop requested in state {:?}", self.state);
                    self.connected = false;
                    transport.send(OutboundCommand::Close)?;
                    return Err(SessionError::Stopped);
                }

                result = wait_barrier(&mut self.barrier) => {
                    let records = result.map_err(|_| SessionError::Aborted)?;
                    self.barrier = None;
                    self.connected = false;
                    self.transition(SessionState::Done);
                    transport.send(OutboundCommand::Close)?;
                    info!("Discovery complete: {} peers", records.len());
                    return Ok(records);
                }

                event = transport.next_event() => {
                    match event {
                        Some(event) => self.handle_event(event, &transport)?,
                        None => {
                            warn!("Transport closed in state {:?}", self.state);
                            return Err(SessionError::TransportClosed);
                        }
                    }
                }
            }
        }
    }

    /// React to one inbound event.
    pub fn handle_event(
        &mut self,
        event: InboundEvent,
        transport: &Transport,
    ) -> Result<(), SessionError> {
        trace!("Event {} in state {:?}", event.kind(), self.state);
        match event {
            InboundEvent::KeepalivePing { token } => {
                transport.send(OutboundCommand::Pong { token })?;
            }

            InboundEvent::HandshakeComplete => {
                if self.connected {
                    debug!("Duplicate handshake completion ignored");
                    return Ok(());
                }
                self.connected = true;
                transport.send(OutboundCommand::Join {
                    channel: self.channel.clone(),
                })?;
                self.transition(SessionState::Joining);
            }

            InboundEvent::RosterFragment { members } => {
                if self.barrier.is_some() {
                    debug!("Roster fragment after queries were issued, ignoring");
                    return Ok(());
                }
                let before = self.candidates.len();
                self.candidates.extend(
                    members
                        .into_iter()
                        .filter(|m| m.starts_with(&self.member_prefix)),
                );
                debug!(
                    "Roster fragment: {} new candidates ({} total)",
                    self.candidates.len() - before,
                    self.candidates.len()
                );
                if self.state == SessionState::Joining {
                    self.transition(SessionState::CollectingRoster);
                }
            }

            InboundEvent::RosterComplete => {
                if self.barrier.is_some() {
                    debug!("Repeated roster completion ignored");
                    return Ok(());
                }
                self.query_members(transport)?;
            }

            InboundEvent::MetadataReply(reply) => self.on_metadata_reply(reply),

            InboundEvent::Other { command } => {
                debug!("Ignoring {}", command);
            }
        }
        Ok(())
    }

    /// Query every candidate and arm the aggregate barrier.
    fn query_members(&mut self, transport: &Transport) -> Result<(), SessionError> {
        self.transition(SessionState::QueryingMembers);

        let mut receivers = Vec::with_capacity(self.candidates.len());
        for name in &self.candidates {
            if self.pending.contains_key(name) {
                continue;
            }
            let (tx, rx) = oneshot::channel();
            transport.send(OutboundCommand::QueryMember { name: name.clone() })?;
            self.pending.insert(name.clone(), tx);
            receivers.push(rx);
        }

        info!("Queried {} members of {}", receivers.len(), self.channel);

        self.barrier = Some(
            async move {
                join_all(receivers)
                    .await
                    .into_iter()
                    .collect::<Result<Vec<_>, _>>()
            }
            .boxed(),
        );
        self.transition(SessionState::Aggregating);
        Ok(())
    }

    fn on_metadata_reply(&mut self, reply: MetadataReply) {
        if !self.pending.contains_key(&reply.name) {
            debug!("Unsolicited metadata reply for {}", reply.name);
            return;
        }

        let record = match PeerRecord::from_reply(&reply.name, &reply.host, &reply.info) {
            Ok(record) => record,
            Err(e) => {
                warn!("Malformed metadata reply from {}: {}", reply.name, e);
                return;
            }
        };

        if let Some(tx) = self.pending.remove(&reply.name) {
            debug!("Resolved {}", record);
            if tx.send(record).is_err() {
                debug!("Aggregate for {} already dropped", reply.name);
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            debug!("Session {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }
}

impl Default for DiscoverySession {
    fn default() -> Self {
        Self::from_config(&DiscoveryConfig::default())
    }
}

/// Await the barrier if armed, otherwise never resolve.
async fn wait_barrier(
    barrier: &mut Option<Barrier>,
) -> Result<Vec<PeerRecord>, oneshot::error::RecvError> {
    match barrier {
        Some(barrier) => barrier.await,
        None => std::future::pending().await,
    }
}

/// Handle to a spawned session.
pub struct DiscoveryHandle {
    shutdown: Arc<Notify>,
    task: JoinHandle<Result<Vec<PeerRecord>, SessionError>>,
}

impl DiscoveryHandle {
    /// Ask the session to close its transport and end.
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }

    /// Detached stop capability, usable after [`DiscoveryHandle::wait`]
    /// has taken the handle.
    pub fn stopper(&self) -> SessionStopper {
        SessionStopper {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Whether the session has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the aggregate result.
    pub async fn wait(self) -> Result<Vec<PeerRecord>, SessionError> {
        self.task.await?
    }
}

/// Stops a running session from anywhere.
#[derive(Clone)]
pub struct SessionStopper {
    shutdown: Arc<Notify>,
}

impl SessionStopper {
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(name: &str, info: &str) -> InboundEvent {
        InboundEvent::MetadataReply(MetadataReply {
            name: name.into(),
            host: format!("{}.example.org", name.to_lowercase()),
            info: info.into(),
        })
    }

    fn roster(names: &[&str]) -> InboundEvent {
        InboundEvent::RosterFragment {
            members: names.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_new_session_idle() {
        let session = DiscoverySession::default();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(!session.is_connected());
        assert_eq!(session.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_handshake_joins_once() {
        let (transport, mut peer) = transport::channel(8);
        let mut session = DiscoverySession::new("#electrum", "E_");

        session
            .handle_event(InboundEvent::HandshakeComplete, &transport)
            .unwrap();
        session
            .handle_event(InboundEvent::HandshakeComplete, &transport)
            .unwrap();

        assert_eq!(
            peer.drain_commands(),
            vec![OutboundCommand::Join {
                channel: "#electrum".into()
            }]
        );
        assert!(session.is_connected());
        assert_eq!(session.state(), SessionState::Joining);
    }

    #[tokio::test]
    async fn test_roster_filter_preserves_order() {
        let (transport, _peer) = transport::channel(8);
        let mut session = DiscoverySession::new("#electrum", "E_");

        session
            .handle_event(roster(&["E_alice", "bob", "E_carol"]), &transport)
            .unwrap();
        assert_eq!(session.candidates(), ["E_alice", "E_carol"]);
    }

    #[tokio::test]
    async fn test_roster_accumulates_fragments() {
        let (transport, _peer) = transport::channel(8);
        let mut session = DiscoverySession::new("#electrum", "E_");

        session
            .handle_event(roster(&["E_a", "x"]), &transport)
            .unwrap();
        session
            .handle_event(roster(&["E_b", "E_c"]), &transport)
            .unwrap();
        assert_eq!(session.candidates(), ["E_a", "E_b", "E_c"]);
    }

    #[tokio::test]
    async fn test_ping_answered_in_any_state() {
        let (transport, mut peer) = transport::channel(8);
        let mut session = DiscoverySession::new("#electrum", "E_");

        let ping = || InboundEvent::KeepalivePing {
            token: "srv".into(),
        };
        session.handle_event(ping(), &transport).unwrap();
        session
            .handle_event(InboundEvent::HandshakeComplete, &transport)
            .unwrap();
        session.handle_event(roster(&["E_a"]), &transport).unwrap();
        session
            .handle_event(InboundEvent::RosterComplete, &transport)
            .unwrap();
        session.handle_event(ping(), &transport).unwrap();

        let pongs = peer
            .drain_commands()
            .into_iter()
            .filter(|c| matches!(c, OutboundCommand::Pong { .. }))
            .count();
        assert_eq!(pongs, 2);
        assert_eq!(session.state(), SessionState::Aggregating);
    }

    #[tokio::test]
    async fn test_duplicate_candidates_queried_once() {
        let (transport, mut peer) = transport::channel(8);
        let mut session = DiscoverySession::new("#electrum", "E_");

        session.handle_event(roster(&["E_a"]), &transport).unwrap();
        session
            .handle_event(roster(&["E_a", "E_b"]), &transport)
            .unwrap();
        session
            .handle_event(InboundEvent::RosterComplete, &transport)
            .unwrap();

        assert_eq!(
            peer.drain_commands(),
            vec![
                OutboundCommand::QueryMember { name: "E_a".into() },
                OutboundCommand::QueryMember { name: "E_b".into() },
            ]
        );
        assert_eq!(session.pending_count(), 2);
    }

    #[tokio::test]
    async fn test_unsolicited_reply_ignored() {
        let (transport, _peer) = transport::channel(8);
        let mut session = DiscoverySession::new("#electrum", "E_");

        session.handle_event(roster(&["E_a"]), &transport).unwrap();
        session
            .handle_event(InboundEvent::RosterComplete, &transport)
            .unwrap();
        session
            .handle_event(reply("E_zz", "1.0 x y p0 t"), &transport)
            .unwrap();
        assert_eq!(session.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_reply_keeps_pending() {
        let (transport, _peer) = transport::channel(8);
        let mut session = DiscoverySession::new("#electrum", "E_");

        session
            .handle_event(roster(&["E_a", "E_b"]), &transport)
            .unwrap();
        session
            .handle_event(InboundEvent::RosterComplete, &transport)
            .unwrap();
        session
            .handle_event(reply("E_a", "garbage"), &transport)
            .unwrap();
        session
            .handle_event(reply("E_b", "1.0 x y p0 s"), &transport)
            .unwrap();

        assert_eq!(session.pending_count(), 1);
    }

    #[tokio::test]
    async fn test_empty_roster_resolves_immediately() {
        let (transport, peer) = transport::channel(8);
        let session = DiscoverySession::new("#electrum", "E_");
        let handle = session.start(transport);

        assert!(peer.deliver(InboundEvent::HandshakeComplete).await);
        assert!(peer.deliver(roster(&["alice", "bob"])).await);
        assert!(peer.deliver(InboundEvent::RosterComplete).await);

        let records = handle.wait().await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_stop_closes_transport() {
        let (transport, mut peer) = transport::channel(8);
        let handle = DiscoverySession::default().start(transport);

        handle.stop();
        let result = handle.wait().await;
        assert!(matches!(result, Err(SessionError::Stopped)));
        assert_eq!(peer.drain_commands(), vec![OutboundCommand::Close]);
    }

    #[tokio::test]
    async fn test_transport_closed_before_handshake() {
        let (transport, peer) = transport::channel(8);
        let handle = DiscoverySession::default().start(transport);

        drop(peer);
        let result = handle.wait().await;
        assert!(matches!(result, Err(SessionError::TransportClosed)));
    }
}
