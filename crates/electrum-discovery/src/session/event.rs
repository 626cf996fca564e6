// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Inbound protocol events consumed by the discovery session.
//!
//! Events are built once at the transport boundary; the session only sees
//! named fields, never raw protocol parameters.

/// A metadata reply describing one channel member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataReply {
    /// Member name the reply describes.
    pub name: String,
    /// Host the member connects from.
    pub host: String,
    /// Free-text announcement (version, pruning, services).
    pub info: String,
}

/// Events the session reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// Registration finished; commands may now be sent.
    HandshakeComplete,

    /// Part of the channel roster. May arrive several times.
    RosterFragment { members: Vec<String> },

    /// The roster has been fully delivered.
    RosterComplete,

    /// Reply to a member query.
    MetadataReply(MetadataReply),

    /// Keepalive ping; must be answered with the same token.
    KeepalivePing { token: String },

    /// Anything the session does not care about.
    Other { command: String },
}

impl InboundEvent {
    /// Short name used in trace output.
    pub fn kind(&self) -> &str {
        match self {
            Self::HandshakeComplete => "handshake_complete",
            Self::RosterFragment { .. } => "roster_fragment",
            Self::RosterComplete => "roster_complete",
            Self::MetadataReply(_) => "metadata_reply",
            Self::KeepalivePing { .. } => "keepalive_ping",
            Self::Other { command } => command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind() {
        assert_eq!(InboundEvent::RosterComplete.kind(), "roster_complete");
        let other = InboundEvent::Other {
            command: "NOTICE".into(),
        };
        assert_eq!(other.kind(), "NOTICE");
    }
}
