// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! IRC line parsing and encoding.
//!
//! Wire format (RFC 1459, optional IRCv3 tags skipped):
//! ```text
//! [@tags ][:prefix ]COMMAND [param ...] [:trailing param]
//! ```
//!
//! Only the replies the discovery session needs are mapped to named events:
//!
//! | Numeric | Event |
//! |---------|-------|
//! | 376 RPL_ENDOFMOTD, 422 ERR_NOMOTD | `HandshakeComplete` |
//! | 353 RPL_NAMREPLY | `RosterFragment` |
//! | 366 RPL_ENDOFNAMES | `RosterComplete` |
//! | 352 RPL_WHOREPLY | `MetadataReply` |
//! | PING | `KeepalivePing` |

use crate::session::{InboundEvent, MetadataReply, OutboundCommand};
use thiserror::Error;

pub const RPL_WHOREPLY: &str = "352";
pub const RPL_NAMREPLY: &str = "353";
pub const RPL_ENDOFNAMES: &str = "366";
pub const RPL_ENDOFMOTD: &str = "376";
pub const ERR_NOMOTD: &str = "422";

/// `353 <me> <type> <channel> :<names>`
const NAMES_PARAM: usize = 3;

/// `352 <me> <channel> <user> <host> <server> <nick> <flags> :<hops> <realname>`
const WHO_HOST_PARAM: usize = 3;
const WHO_NICK_PARAM: usize = 5;
const WHO_INFO_PARAM: usize = 7;

/// Line parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("empty line")]
    Empty,

    #[error("missing command in {0:?}")]
    MissingCommand(String),
}

/// One parsed IRC line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IrcMessage {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl IrcMessage {
    /// Parse a line without its trailing CR/LF.
    pub fn parse(line: &str) -> Result<Self, MessageError> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        if rest.starts_with('@') {
            rest = rest.split_once(' ').map(|(_, r)| r).unwrap_or("");
        }
        rest = rest.trim_start_matches(' ');
        if rest.is_empty() {
            return Err(MessageError::Empty);
        }

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, r) = stripped.split_once(' ').unwrap_or((stripped, ""));
                rest = r.trim_start_matches(' ');
                Some(prefix.to_string())
            }
            None => None,
        };

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return Err(MessageError::MissingCommand(line.to_string()));
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            let (param, r) = rest.split_once(' ').unwrap_or((rest, ""));
            params.push(param.to_string());
            rest = r;
        }

        Ok(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    /// Map this line to the event the session sees.
    pub fn into_event(self) -> InboundEvent {
        match self.command.as_str() {
            RPL_ENDOFMOTD | ERR_NOMOTD => InboundEvent::HandshakeComplete,
            RPL_ENDOFNAMES => InboundEvent::RosterComplete,
            RPL_NAMREPLY if self.params.len() > NAMES_PARAM => InboundEvent::RosterFragment {
                members: self.params[NAMES_PARAM]
                    .split_whitespace()
                    .map(|name| name.trim_start_matches(['@', '+']).to_string())
                    .filter(|name| !name.is_empty())
                    .collect(),
            },
            RPL_WHOREPLY if self.params.len() > WHO_INFO_PARAM => {
                let mut params = self.params;
                InboundEvent::MetadataReply(MetadataReply {
                    info: std::mem::take(&mut params[WHO_INFO_PARAM]),
                    name: std::mem::take(&mut params[WHO_NICK_PARAM]),
                    host: std::mem::take(&mut params[WHO_HOST_PARAM]),
                })
            }
            "PING" => InboundEvent::KeepalivePing {
                token: self.params.into_iter().next().unwrap_or_default(),
            },
            other => InboundEvent::Other {
                command: other.to_string(),
            },
        }
    }
}

/// Encode a session command as an IRC line (without CRLF).
pub fn encode_command(command: &OutboundCommand) -> String {
    match command {
        OutboundCommand::Join { channel } => format!("JOIN {}", clean(channel)),
        OutboundCommand::QueryMember { name } => format!("WHO {}", clean(name)),
        OutboundCommand::Pong { token } => format!("PONG :{}", clean(token)),
        OutboundCommand::Close => "QUIT".to_string(),
    }
}

/// Registration lines sent before the session starts.
pub fn registration(nickname: &str, realname: &str) -> [String; 2] {
    let nickname = clean(nickname);
    [
        format!("NICK {}", nickname),
        format!("USER {} 0 * :{}", nickname, clean(realname)),
    ]
}

/// Strip line breaks so a value cannot smuggle a second command.
fn clean(value: &str) -> String {
    value.replace(['\r', '\n'], "")
}
