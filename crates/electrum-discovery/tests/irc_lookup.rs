// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! `lookup` against a scripted local IRC server.

use electrum_discovery::{lookup, DiscoveryConfig, LookupError, ServiceKind};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

struct FakePeer {
    name: &'static str,
    host: &'static str,
    info: &'static str,
}

const PEERS: &[FakePeer] = &[
    FakePeer {
        name: "E_x",
        host: "x.example.org",
        info: "0 x.example.org v1.2 p4 s7001 t",
    },
    FakePeer {
        name: "E_y",
        host: "y.example.org",
        info: "0 y.example.org v1.4 p0 s",
    },
];

async fn send(write: &mut OwnedWriteHalf, line: &str) {
    write.write_all(line.as_bytes()).await.unwrap();
    write.write_all(b"\r\n").await.unwrap();
}

/// Accept one client and play the discovery script. Returns every line the
/// client sent.
fn spawn_server(listener: TcpListener, send_motd: bool) -> JoinHandle<Vec<String>> {
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();
        let mut received = Vec::new();
        let mut queried = Vec::new();

        while let Ok(Some(line)) = lines.next_line().await {
            received.push(line.clone());

            if line.starts_with("USER ") {
                send(&mut write, ":srv 001 me :Welcome").await;
                if send_motd {
                    send(&mut write, ":srv 376 me :End of /MOTD command.").await;
                }
            } else if line == "JOIN #electrum" {
                send(&mut write, ":me!u@h JOIN #electrum").await;
                send(&mut write, ":srv 353 me = #electrum :E_x bob").await;
                send(&mut write, ":srv 353 me = #electrum :@E_y carol").await;
                send(&mut write, ":srv 366 me #electrum :End of /NAMES list.").await;
            } else if let Some(name) = line.strip_prefix("WHO ") {
                queried.push(name.to_string());
                if queried.len() == PEERS.len() {
                    send(&mut write, "PING :keepalive").await;
                    let flood = format!(":srv NOTICE me :{}", "x".repeat(10_000));
                    send(&mut write, &flood).await;
                    for peer in PEERS.iter().rev() {
                        let who = format!(
                            ":srv 352 me #electrum ~u {} srv {} H :{}",
                            peer.host, peer.name, peer.info
                        );
                        send(&mut write, &who).await;
                    }
                }
            } else if line == "QUIT" {
                break;
            }
        }
        received
    })
}

async fn local_server(send_motd: bool) -> (SocketAddr, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (addr, spawn_server(listener, send_motd))
}

fn config_for(addr: SocketAddr, timeout_secs: u64) -> DiscoveryConfig {
    DiscoveryConfig {
        server_host: addr.ip().to_string(),
        server_port: addr.port(),
        timeout_secs,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_lookup_collects_all_peers() {
    let (addr, server) = local_server(true).await;

    let records = lookup(&config_for(addr, 10)).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name(), "E_x");
    assert_eq!(records[0].host(), "x.example.org");
    assert_eq!(records[0].pruning_depth(), 4);
    // The WHO trailing parameter starts with the hop count, which lands in
    // the version slot of the announcement.
    assert_eq!(records[0].version(), "0");
    assert_eq!(records[0].port(ServiceKind::Secure), Ok(7001));
    assert_eq!(records[1].name(), "E_y");
    assert!(records[1].plain_port().is_err());

    let received = server.await.unwrap();
    assert!(received[0].starts_with("NICK discovery_"));
    assert!(received[1].starts_with("USER discovery_"));
    assert_eq!(received.iter().filter(|l| *l == "JOIN #electrum").count(), 1);
    assert_eq!(received.iter().filter(|l| l.starts_with("WHO ")).count(), 2);
    assert_eq!(
        received.iter().filter(|l| *l == "PONG :keepalive").count(),
        1
    );
    assert_eq!(received.last().map(String::as_str), Some("QUIT"));
}

#[tokio::test]
async fn test_lookup_times_out_without_handshake() {
    let (addr, server) = local_server(false).await;

    let err = lookup(&config_for(addr, 1)).await.unwrap_err();
    assert!(matches!(err, LookupError::Timeout(_)));

    let received = server.await.unwrap();
    assert!(!received.iter().any(|l| l.starts_with("JOIN")));
    assert_eq!(received.last().map(String::as_str), Some("QUIT"));
}

#[tokio::test]
async fn test_lookup_rejects_invalid_config() {
    let config = DiscoveryConfig {
        channel: "no-hash".into(),
        ..Default::default()
    };
    let err = lookup(&config).await.unwrap_err();
    assert!(matches!(err, LookupError::Config(_)));
}

#[tokio::test]
async fn test_lookup_connection_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = lookup(&config_for(addr, 1)).await.unwrap_err();
    assert!(matches!(err, LookupError::Connection(_)));
}
