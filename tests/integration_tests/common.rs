//! Shared test harness: spins up a real `chatroomd` server (TLS, worker pool,
//! directories, accept loop) against an in-memory self-signed certificate and
//! a scratch `TempDir`, and gives scenario tests a small client-side framing
//! helper to drive it over the wire.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chatroom_server::{
    domain::{RoomDirectory, UserDirectory},
    net::listener,
    protocol::{
        codec::{decode_payload, encode_payload},
        frames::RejectPayload,
        opcode, Action, FrameHeader, FrameType, RejectCode, HEADER_LEN,
    },
    worker_pool::{ShutdownMode, WorkerPool},
};
use rcgen::{generate_simple_self_signed, CertifiedKey};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    task::JoinHandle,
    time::timeout,
};
use tokio_rustls::{
    client::TlsStream,
    rustls::{
        pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer, ServerName},
        ClientConfig, RootCertStore, ServerConfig,
    },
    TlsAcceptor, TlsConnector,
};
use tokio_util::sync::CancellationToken;

/// Longest we'll wait for a reply before deciding the server went quiet.
const READ_DEADLINE: Duration = Duration::from_secs(5);
/// How long a blob-read loop waits for a trailing chunk before assuming the
/// coalesced ACK+payload write is complete.
const BLOB_IDLE: Duration = Duration::from_millis(250);

fn free_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    listener.local_addr().expect("local_addr")
}

fn self_signed_pair() -> Result<(CertificateDer<'static>, PrivateKeyDer<'static>)> {
    let CertifiedKey { cert, key_pair } =
        generate_simple_self_signed(["localhost".to_string()]).context("generate self-signed cert")?;
    let cert_der = cert.der().clone();
    let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
    Ok((cert_der, key_der))
}

/// A running server bound to an ephemeral localhost port, backed by a
/// temporary `users.txt` / `rooms/` tree that is cleaned up on drop.
pub struct TestServer {
    addr: SocketAddr,
    dir: tempfile::TempDir,
    cancel: CancellationToken,
    client_config: Arc<ClientConfig>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start(max_clients: u32, max_rooms: u32) -> Result<Self> {
        Self::start_with_seed(max_clients, max_rooms, "").await
    }

    /// Like [`Self::start`] but seeds `users.txt` with `seed_users` (already
    /// newline-terminated `username:password` lines) before the directory
    /// loads it, so scenarios can start with an `admin` account present.
    pub async fn start_with_seed(max_clients: u32, max_rooms: u32, seed_users: &str) -> Result<Self> {
        let dir = tempfile::tempdir().context("tempdir")?;
        let users_path = dir.path().join("users.txt");
        if !seed_users.is_empty() {
            tokio::fs::write(&users_path, seed_users).await.context("seed users.txt")?;
        }

        let (cert_der, key_der) = self_signed_pair()?;

        let server_config = ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert_der.clone()], key_der)
            .context("build server TLS config")?;
        let acceptor = TlsAcceptor::from(Arc::new(server_config));

        let mut roots = RootCertStore::empty();
        roots.add(cert_der).context("add self-signed cert to root store")?;
        let client_config = Arc::new(
            ClientConfig::builder()
                .with_root_certificates(roots)
                .with_no_client_auth(),
        );

        let addr = free_addr();
        let cancel = CancellationToken::new();

        let users = Arc::new(
            UserDirectory::load_from_file(users_path, max_clients)
                .await
                .context("load user directory")?,
        );
        let rooms = Arc::new(
            RoomDirectory::init(dir.path().join("rooms"), max_rooms)
                .await
                .context("init room directory")?,
        );

        let host = addr.ip().to_string();
        let port = addr.port();
        let run_cancel = cancel.clone();
        let task = tokio::spawn(async move {
            let pool = WorkerPool::new((max_clients + 1) as usize, (max_clients + 1) as usize, run_cancel.clone());
            if let Err(e) = listener::run(&host, port, acceptor, users, rooms.clone(), &pool, run_cancel).await {
                panic!("test listener loop failed: {e}");
            }
            pool.shutdown(ShutdownMode::Wait).await;
            rooms.teardown().await;
        });

        // Give the accept loop a moment to actually bind before the first
        // client dials in.
        let mut attempts = 0;
        loop {
            if TcpStream::connect(addr).await.is_ok() || attempts > 50 {
                break;
            }
            attempts += 1;
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Ok(Self { addr, dir, cancel, client_config, task })
    }

    pub fn rooms_dir(&self) -> PathBuf {
        self.dir.path().join("rooms")
    }

    pub fn users_path(&self) -> PathBuf {
        self.dir.path().join("users.txt")
    }

    pub async fn connect(&self) -> Result<ClientConn> {
        let tcp = TcpStream::connect(self.addr).await.context("connect to test server")?;
        let connector = TlsConnector::from(Arc::clone(&self.client_config));
        let server_name = ServerName::try_from("localhost").expect("valid DNS name").to_owned();
        let stream = connector.connect(server_name, tcp).await.context("TLS handshake")?;
        Ok(ClientConn { stream })
    }

    /// Requests graceful shutdown (mirrors `SIGINT`) and waits for the
    /// accept loop, pool drain, and directory teardown to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        self.task.await.context("server task panicked")?;
        Ok(())
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// One client's view of the wire: raw framed request/response helpers built
/// directly on the protocol types the server itself uses.
pub struct ClientConn {
    stream: TlsStream<TcpStream>,
}

impl ClientConn {
    pub async fn send_request<T>(&mut self, frame_type: FrameType, subtype: u8, payload: Option<&T>) -> Result<()>
    where T: zerocopy::IntoBytes + zerocopy::Immutable {
        let header = FrameHeader::new(frame_type, subtype, Action::Request);
        let mut buf = header.to_bytes().to_vec();
        if let Some(p) = payload {
            buf.extend_from_slice(encode_payload(p));
        }
        self.stream.write_all(&buf).await.context("write request")?;
        Ok(())
    }

    /// Sends a bare request header with no payload (QUIT, CHAT/LEAVE).
    pub async fn send_header_only(&mut self, frame_type: FrameType, subtype: u8) -> Result<()> {
        let header = FrameHeader::new(frame_type, subtype, Action::Request);
        self.stream.write_all(&header.to_bytes()).await.context("write request")?;
        Ok(())
    }

    pub async fn read_header(&mut self) -> Result<FrameHeader> {
        let mut buf = [0u8; HEADER_LEN];
        timeout(READ_DEADLINE, self.stream.read_exact(&mut buf))
            .await
            .context("timed out waiting for a reply header")?
            .context("read header")?;
        Ok(FrameHeader::from_bytes(buf))
    }

    pub async fn read_payload(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        timeout(READ_DEADLINE, self.stream.read_exact(&mut buf))
            .await
            .context("timed out waiting for a reply payload")?
            .context("read payload")?;
        Ok(buf)
    }

    /// Reads whatever trails an ACK header until the peer goes quiet for
    /// [`BLOB_IDLE`], for the rooms-list / room-join composite replies whose
    /// length isn't declared on the wire.
    pub async fn read_blob(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let mut chunk = [0u8; 1024];
            match timeout(BLOB_IDLE, self.stream.read(&mut chunk)).await {
                Ok(Ok(0)) | Err(_) => break,
                Ok(Ok(n)) => out.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(e).context("read blob"),
            }
        }
        Ok(out)
    }

    /// Asserts the next frame is an ACKNOWLEDGE with the given (type, subtype).
    pub async fn expect_ack(&mut self, frame_type: FrameType, subtype: u8) -> Result<()> {
        let header = self.read_header().await?;
        anyhow::ensure!(header.frame_type == frame_type as u8, "unexpected frame type {}", header.frame_type);
        anyhow::ensure!(header.subtype == subtype, "unexpected subtype {}", header.subtype);
        anyhow::ensure!(
            header.action().ok() == Some(Action::Acknowledge),
            "expected ACK, got action byte {}",
            header.action
        );
        Ok(())
    }

    /// Like [`Self::expect_ack`] but for the composite ACK+blob replies
    /// (rooms list, room join) whose length isn't declared on the wire.
    pub async fn expect_ack_with_blob(&mut self, frame_type: FrameType, subtype: u8) -> Result<Vec<u8>> {
        self.expect_ack(frame_type, subtype).await?;
        self.read_blob().await
    }

    /// Asserts the next frame is a REJECT with the given code.
    pub async fn expect_reject(&mut self, frame_type: FrameType, subtype: u8, code: RejectCode) -> Result<()> {
        let header = self.read_header().await?;
        anyhow::ensure!(header.frame_type == frame_type as u8, "unexpected frame type {}", header.frame_type);
        anyhow::ensure!(header.subtype == subtype, "unexpected subtype {}", header.subtype);
        anyhow::ensure!(
            header.action().ok() == Some(Action::Reject),
            "expected REJECT, got action byte {}",
            header.action
        );
        let payload = self.read_payload(std::mem::size_of::<RejectPayload>()).await?;
        let reject: RejectPayload = decode_payload(&payload).context("decode reject payload")?;
        anyhow::ensure!(reject.code == code as u8, "expected reject code {:?}, got {}", code, reject.code);
        Ok(())
    }

    /// Reads one CHAT UPDATE frame and returns `(sender, body)`.
    pub async fn expect_chat_update(&mut self) -> Result<(String, String)> {
        use chatroom_server::protocol::frames::ChatPayload;

        let header = self.read_header().await?;
        anyhow::ensure!(header.frame_type == FrameType::Chat as u8, "expected a CHAT frame");
        anyhow::ensure!(header.subtype == opcode::chat::CHAT, "expected CHAT subtype");
        anyhow::ensure!(
            header.action().ok() == Some(Action::Update),
            "expected an UPDATE, got action byte {}",
            header.action
        );
        let payload = self
            .read_payload(std::mem::size_of::<ChatPayload>())
            .await?;
        let chat: ChatPayload = decode_payload(&payload).context("decode chat payload")?;
        Ok((chat.username()?.to_string(), chat.message()?.to_string()))
    }

    /// No frame arrives within [`BLOB_IDLE`]: used to assert a sender gets no
    /// reply to its own CHAT request.
    pub async fn expect_silence(&mut self) -> Result<()> {
        let mut buf = [0u8; 1];
        match timeout(BLOB_IDLE, self.stream.read(&mut buf)).await {
            Err(_) => Ok(()),
            Ok(Ok(0)) => Ok(()),
            Ok(Ok(n)) => anyhow::bail!("expected silence, got {n} unexpected byte(s)"),
            Ok(Err(e)) => Err(e).context("read while expecting silence"),
        }
    }

    /// True once the peer has closed the connection (clean EOF).
    pub async fn expect_closed(&mut self) -> Result<bool> {
        let mut buf = [0u8; 1];
        match timeout(READ_DEADLINE, self.stream.read(&mut buf)).await {
            Ok(Ok(0)) => Ok(true),
            Ok(Ok(_)) => Ok(false),
            Ok(Err(_)) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}
