// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Electrum server discovery over IRC.
//!
//! Electrum servers announce themselves by joining a well-known IRC channel
//! under an `E_`-prefixed nickname and publishing their version, pruning
//! depth and service ports in their WHO information. This crate joins that
//! channel, queries every announcing member and returns one [`PeerRecord`]
//! per server.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use electrum_discovery::{lookup, DiscoveryConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let peers = lookup(&DiscoveryConfig::default()).await?;
//! for peer in &peers {
//!     println!("{}", peer);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Driving a session directly
//!
//! [`DiscoverySession`] only sees parsed [`InboundEvent`]s and emits
//! [`OutboundCommand`]s over a [`session::transport`] channel pair, so it
//! can run over any connection that produces those events.

pub mod config;
pub mod irc;
pub mod record;
pub mod session;

pub use config::{ConfigError, DiscoveryConfig};
pub use irc::{lookup, LookupError};
pub use record::{PeerRecord, RecordParseError, ServiceKind, UnsupportedServiceError};
pub use session::{
    DiscoveryHandle, DiscoverySession, InboundEvent, MetadataReply, OutboundCommand,
    SessionError, SessionState,
};
