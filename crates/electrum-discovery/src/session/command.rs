// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Outbound commands emitted by the discovery session.

use std::fmt;

/// Commands written to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundCommand {
    /// Join the discovery channel.
    Join { channel: String },

    /// Ask for one member's metadata.
    QueryMember { name: String },

    /// Answer a keepalive ping.
    Pong { token: String },

    /// Terminate the connection. Sent once, after aggregation.
    Close,
}

impl fmt::Display for OutboundCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Join { channel } => write!(f, "join {}", channel),
            Self::QueryMember { name } => write!(f, "query {}", name),
            Self::Pong { token } => write!(f, "pong {}", token),
            Self::Close => write!(f, "close"),
        }
    }
}
