// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Plaintext IRC connection: line framing and the transport driver.

use super::message::{encode_command, registration, IrcMessage};
use crate::session::{InboundEvent, OutboundCommand, TransportPeer};
use std::net::SocketAddr;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// Connection error types.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connect to {address} failed: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    #[error("Driver task failed: {0}")]
    Driver(#[from] tokio::task::JoinError),
}

/// Reads CRLF-terminated IRC lines.
pub struct LineReader {
    reader: BufReader<OwnedReadHalf>,
    max_line_length: usize,
    buffer: Vec<u8>,
}

impl LineReader {
    fn new(read_half: OwnedReadHalf, max_line_length: usize) -> Self {
        Self {
            reader: BufReader::new(read_half),
            max_line_length,
            buffer: Vec::with_capacity(512),
        }
    }

    /// Read the next message.
    ///
    /// Returns `Ok(None)` once the server closes the connection. Blank,
    /// unparsable and over-long lines are skipped.
    pub async fn read_message(&mut self) -> Result<Option<IrcMessage>, ConnectionError> {
        loop {
            self.buffer.clear();
            let limit = self.max_line_length as u64 + 1;
            let n = (&mut self.reader)
                .take(limit)
                .read_until(b'\n', &mut self.buffer)
                .await?;
            if n == 0 {
                return Ok(None);
            }
            if !self.buffer.ends_with(b"\n") && self.buffer.len() > self.max_line_length {
                let skipped = self.buffer.len() + self.discard_line().await?;
                debug!(
                    "Skipping {} byte line (limit {})",
                    skipped, self.max_line_length
                );
                continue;
            }

            let line = String::from_utf8_lossy(&self.buffer);
            trace!("<< {}", line.trim_end());
            match IrcMessage::parse(&line) {
                Ok(msg) => return Ok(Some(msg)),
                Err(e) => debug!("Skipping line: {}", e),
            }
        }
    }

    /// Consume input up to and including the next `\n`.
    async fn discard_line(&mut self) -> Result<usize, ConnectionError> {
        let mut total = 0;
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(total);
            }
            let (n, done) = match available.iter().position(|b| *b == b'\n') {
                Some(pos) => (pos + 1, true),
                None => (available.len(), false),
            };
            self.reader.consume(n);
            total += n;
            if done {
                return Ok(total);
            }
        }
    }

    /// Forward parsed events to the session until either side closes.
    async fn forward(mut self, events: mpsc::Sender<InboundEvent>) -> Result<(), ConnectionError> {
        while let Some(msg) = self.read_message().await? {
            if events.send(msg.into_event()).await.is_err() {
                debug!("Session gone, reader stopping");
                break;
            }
        }
        Ok(())
    }
}

/// A connected IRC client.
pub struct IrcConnection {
    reader: LineReader,
    writer: OwnedWriteHalf,
    peer_addr: SocketAddr,
}

impl IrcConnection {
    /// Connect to `address` (`host:port`).
    pub async fn connect(address: &str, max_line_length: usize) -> Result<Self, ConnectionError> {
        let stream =
            TcpStream::connect(address)
                .await
                .map_err(|source| ConnectionError::Connect {
                    address: address.to_string(),
                    source,
                })?;
        Self::new(stream, max_line_length)
    }

    /// Wrap an already connected stream.
    pub fn new(stream: TcpStream, max_line_length: usize) -> Result<Self, ConnectionError> {
        let peer_addr = stream.peer_addr()?;
        let (read_half, writer) = stream.into_split();
        Ok(Self {
            reader: LineReader::new(read_half, max_line_length),
            writer,
            peer_addr,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Send NICK and USER.
    pub async fn register(&mut self, nickname: &str, realname: &str) -> Result<(), ConnectionError> {
        for line in registration(nickname, realname) {
            self.send_line(&line).await?;
        }
        Ok(())
    }

    /// Read the next message directly (before handing off to a session).
    pub async fn read_message(&mut self) -> Result<Option<IrcMessage>, ConnectionError> {
        self.reader.read_message().await
    }

    /// Write one line, appending CRLF.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ConnectionError> {
        trace!(">> {}", line);
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Pump the transport: inbound lines become session events, session
    /// commands become lines. Ends after `Close` or when the session is gone.
    pub async fn drive(self, peer: TransportPeer) -> Result<(), ConnectionError> {
        let Self {
            reader,
            mut writer,
            peer_addr,
        } = self;
        let TransportPeer {
            events,
            mut commands,
        } = peer;

        let read_task = tokio::spawn(reader.forward(events));

        let result = async {
            while let Some(command) = commands.recv().await {
                let line = encode_command(&command);
                trace!(">> {}", line);
                writer.write_all(line.as_bytes()).await?;
                writer.write_all(b"\r\n").await?;
                writer.flush().await?;

                if command == OutboundCommand::Close {
                    debug!("Closing connection to {}", peer_addr);
                    writer.shutdown().await?;
                    break;
                }
            }
            Ok::<(), ConnectionError>(())
        }
        .await;

        if read_task.is_finished() {
            match read_task.await? {
                Ok(()) => {}
                Err(e) => warn!("Read error from {}: {}", peer_addr, e),
            }
        } else {
            read_task.abort();
        }

        result
    }
}
