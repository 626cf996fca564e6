// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Discovered peer records.
//!
//! A [`PeerRecord`] describes one Electrum server as it announced itself in
//! its metadata reply. The announcement is a whitespace-separated token list:
//!
//! ```text
//! <version> <unused> <unused> <pruning-flag> [<service-flag>...]
//! ```
//!
//! The pruning flag is a one-letter marker followed by the depth (`p100`).
//! Service flags are `s` (secure) or `t` (plain), optionally followed by a
//! custom port (`s50012`).

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Default port for the plaintext service.
pub const DEFAULT_PLAIN_PORT: u16 = 50001;

/// Default port for the TLS service.
pub const DEFAULT_SECURE_PORT: u16 = 50002;

/// Service kind advertised by a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    /// Unencrypted TCP (`t` flag).
    Plain,
    /// TLS over TCP (`s` flag).
    Secure,
}

impl ServiceKind {
    /// Map a service-flag letter to its kind.
    pub fn from_flag(flag: char) -> Option<Self> {
        match flag {
            't' => Some(Self::Plain),
            's' => Some(Self::Secure),
            _ => None,
        }
    }

    /// Port used when the peer does not announce one.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Plain => DEFAULT_PLAIN_PORT,
            Self::Secure => DEFAULT_SECURE_PORT,
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Secure => write!(f, "secure"),
        }
    }
}

/// A port was requested for a service the peer does not offer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("peer {peer} does not offer the {service} service")]
pub struct UnsupportedServiceError {
    pub peer: String,
    pub service: ServiceKind,
}

/// Malformed metadata announcement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordParseError {
    #[error("announcement has {found} tokens, expected at least {expected}")]
    MissingField { expected: usize, found: usize },

    #[error("invalid pruning flag: {0:?}")]
    InvalidPruning(String),

    #[error("invalid port in service flag: {0:?}")]
    InvalidPort(String),
}

/// Index of the version token in the announcement.
const VERSION_TOKEN: usize = 0;

/// Index of the pruning flag in the announcement.
const PRUNING_TOKEN: usize = 3;

/// One discovered peer. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerRecord {
    name: String,
    host: String,
    version: String,
    pruning_depth: u32,
    supports_plain: bool,
    supports_secure: bool,
    plain_port: u16,
    secure_port: u16,
}

impl PeerRecord {
    /// Create a record with full retention and no advertised services.
    pub fn new(
        version: impl Into<String>,
        name: impl Into<String>,
        host: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            version: version.into(),
            pruning_depth: 0,
            supports_plain: false,
            supports_secure: false,
            plain_port: DEFAULT_PLAIN_PORT,
            secure_port: DEFAULT_SECURE_PORT,
        }
    }

    /// Set the pruning depth.
    pub fn with_pruning_depth(mut self, depth: u32) -> Self {
        self.pruning_depth = depth;
        self
    }

    /// Advertise a service, on `port` or its default port.
    pub fn with_service(mut self, kind: ServiceKind, port: Option<u16>) -> Self {
        let port = port.unwrap_or_else(|| kind.default_port());
        match kind {
            ServiceKind::Plain => {
                self.supports_plain = true;
                self.plain_port = port;
            }
            ServiceKind::Secure => {
                self.supports_secure = true;
                self.secure_port = port;
            }
        }
        self
    }

    /// Build a record from a peer's metadata reply fields.
    pub fn from_reply(name: &str, host: &str, info: &str) -> Result<Self, RecordParseError> {
        let tokens: Vec<&str> = info.split_whitespace().collect();
        if tokens.len() <= PRUNING_TOKEN {
            return Err(RecordParseError::MissingField {
                expected: PRUNING_TOKEN + 1,
                found: tokens.len(),
            });
        }

        let pruning_flag = tokens[PRUNING_TOKEN];
        let pruning_depth = strip_flag(pruning_flag)
            .parse::<u32>()
            .map_err(|_| RecordParseError::InvalidPruning(pruning_flag.to_string()))?;

        let mut record =
            Self::new(tokens[VERSION_TOKEN], name, host).with_pruning_depth(pruning_depth);

        for flag in &tokens[PRUNING_TOKEN + 1..] {
            let Some(kind) = flag.chars().next().and_then(ServiceKind::from_flag) else {
                continue;
            };
            let digits = strip_flag(flag);
            let port = if digits.is_empty() {
                None
            } else {
                Some(
                    digits
                        .parse::<u16>()
                        .map_err(|_| RecordParseError::InvalidPort(flag.to_string()))?,
                )
            };
            record = record.with_service(kind, port);
        }

        Ok(record)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Blocks kept by the peer; 0 means full history.
    pub fn pruning_depth(&self) -> u32 {
        self.pruning_depth
    }

    pub fn supports_plain(&self) -> bool {
        self.supports_plain
    }

    pub fn supports_secure(&self) -> bool {
        self.supports_secure
    }

    /// Whether the peer offers `kind`.
    pub fn supports(&self, kind: ServiceKind) -> bool {
        match kind {
            ServiceKind::Plain => self.supports_plain,
            ServiceKind::Secure => self.supports_secure,
        }
    }

    /// Plaintext port. Fails if the peer does not offer plaintext.
    pub fn plain_port(&self) -> Result<u16, UnsupportedServiceError> {
        self.port(ServiceKind::Plain)
    }

    /// TLS port. Fails if the peer does not offer TLS.
    pub fn secure_port(&self) -> Result<u16, UnsupportedServiceError> {
        self.port(ServiceKind::Secure)
    }

    /// Port for `kind`, if the peer offers it.
    pub fn port(&self, kind: ServiceKind) -> Result<u16, UnsupportedServiceError> {
        if !self.supports(kind) {
            return Err(UnsupportedServiceError {
                peer: self.name.clone(),
                service: kind,
            });
        }
        Ok(match kind {
            ServiceKind::Plain => self.plain_port,
            ServiceKind::Secure => self.secure_port,
        })
    }

    /// `host:port` for `kind`.
    pub fn endpoint(&self, kind: ServiceKind) -> Result<String, UnsupportedServiceError> {
        let port = self.port(kind)?;
        Ok(format!("{}:{}", self.host, port))
    }

    /// Advertised services with their ports, plain first.
    pub fn services(&self) -> Vec<(ServiceKind, u16)> {
        [ServiceKind::Plain, ServiceKind::Secure]
            .into_iter()
            .filter_map(|kind| self.port(kind).ok().map(|port| (kind, port)))
            .collect()
    }
}

impl fmt::Display for PeerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} v{}", self.name, self.host, self.version)?;
        for (kind, port) in self.services() {
            write!(f, " {}:{}", kind, port)?;
        }
        if self.pruning_depth > 0 {
            write!(f, " pruning={}", self.pruning_depth)?;
        }
        Ok(())
    }
}

/// Drop the leading marker character of a flag token.
fn strip_flag(flag: &str) -> &str {
    let mut chars = flag.chars();
    chars.next();
    chars.as_str()
}
