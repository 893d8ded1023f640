//! Framed read/write over a TLS stream, with the 3-second receive timeout
//! the session dispatcher relies on to observe shutdown.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{sync::Arc, time::Duration};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf},
    net::TcpStream,
    sync::Mutex,
};
use tokio_util::sync::CancellationToken;
use zerocopy::{Immutable, IntoBytes};

use crate::protocol::{CodecError, FrameHeader, HEADER_LEN};

pub type TlsStream = tokio_rustls::server::TlsStream<TcpStream>;
pub type TlsReadHalf = ReadHalf<TlsStream>;

/// Type-erased so unit tests can stand in a `DuplexStream` half for a real
/// TLS write half.
pub type DynWriter = dyn tokio::io::AsyncWrite + Send + Unpin;

/// A connection's write half, shared between the owning session task and
/// any other session's room-broadcast fan-out.
pub type SharedWriter = Arc<Mutex<Box<DynWriter>>>;

/// How long a read may idle before the dispatcher re-checks the shutdown
/// token.
pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(3);

/// Result of racing a header read against the idle timeout and the shutdown
/// token.
pub enum ReadOutcome {
    Header(FrameHeader),
    /// Clean EOF: the peer closed the connection.
    Eof,
    /// The read timed out with no shutdown requested; the caller should loop
    /// and try again.
    Idle,
    /// The shutdown token fired while waiting for a header.
    Cancelled,
    Io(std::io::Error),
}

/// Owns the read half of a session's TLS stream and a shared handle to its
/// write half.
pub struct FrameTransport {
    reader: TlsReadHalf,
    writer: SharedWriter,
}

impl FrameTransport {
    pub fn new(stream: TlsStream) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader,
            writer: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn writer_handle(&self) -> SharedWriter {
        Arc::clone(&self.writer)
    }

    /// Reads a 3-byte header, racing the shutdown token and a bounded idle
    /// timeout.
    ///
    /// Distinguishes "nothing arrived within the timeout, but the client is
    /// still there" ([`ReadOutcome::Idle`]) from an actual shutdown request
    /// ([`ReadOutcome::Cancelled`]), since the dispatcher needs to keep
    /// looping on the former and unwind on the latter.
    pub async fn read_header(&mut self, cancel: &CancellationToken) -> ReadOutcome {
        let mut buf = [0u8; HEADER_LEN];
        tokio::select! {
            _ = cancel.cancelled() => ReadOutcome::Cancelled,
            res = tokio::time::timeout(RECEIVE_TIMEOUT, self.reader.read_exact(&mut buf)) => {
                match res {
                    Err(_) => ReadOutcome::Idle,
                    Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => ReadOutcome::Eof,
                    Ok(Err(e)) => ReadOutcome::Io(e),
                    Ok(Ok(_)) => ReadOutcome::Header(FrameHeader::from_bytes(buf)),
                }
            }
        }
    }

    /// Reads exactly `len` bytes of payload following a header already read.
    pub async fn read_payload(
        &mut self,
        len: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, CodecError> {
        let mut buf = vec![0u8; len];
        tokio::select! {
            _ = cancel.cancelled() => Err(CodecError::Timeout),
            res = tokio::time::timeout(RECEIVE_TIMEOUT, self.reader.read_exact(&mut buf)) => {
                match res {
                    Err(_) => Err(CodecError::Timeout),
                    Ok(Err(e)) => Err(e.into()),
                    Ok(Ok(_)) => Ok(buf),
                }
            }
        }
    }

}

/// Writes a bare 3-byte header with no payload (ACKNOWLEDGE frames, and the
/// FAIL/FAIL reject carries its own payload so this is only for the
/// payload-less cases).
pub async fn write_header_only(writer: &SharedWriter, header: FrameHeader) -> std::io::Result<()> {
    let mut w = writer.lock().await;
    w.write_all(&header.to_bytes()).await
}

/// Writes a header plus an optional fixed-layout payload as a single
/// `write_all` over a scratch buffer.
pub async fn write_frame<T>(
    writer: &SharedWriter,
    header: FrameHeader,
    payload: Option<&T>,
) -> std::io::Result<()>
where T: IntoBytes + Immutable {
    let mut scratch = Vec::with_capacity(HEADER_LEN + payload.map(|p| p.as_bytes().len()).unwrap_or(0));
    scratch.extend_from_slice(&header.to_bytes());
    if let Some(p) = payload {
        scratch.extend_from_slice(p.as_bytes());
    }
    let mut w = writer.lock().await;
    w.write_all(&scratch).await
}

/// Writes a header immediately followed by the raw bytes of a file (rooms
/// list, room join, room log fetch), coalesced into one `write_all`.
pub async fn write_frame_with_blob(
    writer: &SharedWriter,
    header: FrameHeader,
    blob: &[u8],
) -> std::io::Result<()> {
    let mut scratch = Vec::with_capacity(HEADER_LEN + blob.len());
    scratch.extend_from_slice(&header.to_bytes());
    scratch.extend_from_slice(blob);
    let mut w = writer.lock().await;
    w.write_all(&scratch).await
}
