// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! IRC-backed discovery.
//!
//! [`lookup`] is the one-shot entry point: connect, register with a random
//! nickname, run a [`DiscoverySession`] under the configured deadline and
//! hang up.

use crate::config::{ConfigError, DiscoveryConfig};
use crate::record::PeerRecord;
use crate::session::{transport, DiscoverySession, SessionError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod connection;
pub mod message;

pub use connection::{ConnectionError, IrcConnection};
pub use message::IrcMessage;

/// How long to wait for the driver to flush QUIT after the session ends.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Lookup errors.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Discovery did not complete within {0:?}")]
    Timeout(Duration),
}

/// Discover peers on the network described by `config`.
pub async fn lookup(config: &DiscoveryConfig) -> Result<Vec<PeerRecord>, LookupError> {
    config.validate()?;

    let address = config.server_address();
    let nickname = config.generate_nickname();
    info!("Connecting to {} as {}", address, nickname);

    let mut connection = IrcConnection::connect(&address, config.max_line_length).await?;
    connection.register(&nickname, &config.realname).await?;

    lookup_on(connection, config).await
}

/// Run discovery over an already registered connection.
pub async fn lookup_on(
    connection: IrcConnection,
    config: &DiscoveryConfig,
) -> Result<Vec<PeerRecord>, LookupError> {
    let (transport, peer) = transport::channel(config.event_capacity);
    let driver = tokio::spawn(connection.drive(peer));

    let handle = DiscoverySession::from_config(config).start(transport);
    let stopper = handle.stopper();

    let outcome = tokio::time::timeout(config.timeout(), handle.wait()).await;
    if outcome.is_err() {
        warn!("Discovery timed out after {:?}, stopping", config.timeout());
        stopper.stop();
    }

    match tokio::time::timeout(CLOSE_GRACE, driver).await {
        Ok(Ok(Ok(()))) => debug!("Connection closed"),
        Ok(Ok(Err(e))) => warn!("Connection error on close: {}", e),
        Ok(Err(e)) => warn!("Connection driver failed: {}", e),
        Err(_) => warn!("Connection did not close within {:?}", CLOSE_GRACE),
    }

    match outcome {
        Ok(result) => Ok(result?),
        Err(_) => Err(LookupError::Timeout(config.timeout())),
    }
}
