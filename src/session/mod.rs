//! Per-connection dispatch loop.
//!
//! A [`Session`] owns one accepted TLS stream for its whole lifetime: one
//! worker-pool task runs [`run_session`] start to finish. The loop reads a
//! header, reads the payload length the protocol layer already knows for
//! that (type, subtype), checks state-admissibility, and calls into
//! [`crate::handlers`].

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

pub mod state;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, instrument, warn};

pub use crate::session::state::SessionState;
use crate::{
    domain::{Room, RoomDirectory, UserDirectory},
    error::HandlerOutcome,
    handlers,
    net::{
        transport::{write_frame, write_frame_with_blob, write_header_only, TlsStream},
        FrameTransport, ReadOutcome, SharedWriter,
    },
    protocol::{codec::payload_len, frames::RejectPayload, opcode, Action, FrameHeader, FrameType, RejectCode},
};

/// Per-connection state threaded through every handler call.
pub struct Session {
    pub(crate) transport: FrameTransport,
    pub(crate) cancel: CancellationToken,
    pub(crate) users: Arc<UserDirectory>,
    pub(crate) rooms: Arc<RoomDirectory>,
    pub(crate) state: SessionState,
    pub(crate) username: Option<String>,
    pub(crate) room: Option<Arc<Room>>,
}

impl Session {
    fn new(
        transport: FrameTransport,
        users: Arc<UserDirectory>,
        rooms: Arc<RoomDirectory>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            cancel,
            users,
            rooms,
            state: SessionState::Connected,
            username: None,
            room: None,
        }
    }

    pub(crate) fn writer_handle(&self) -> SharedWriter {
        self.transport.writer_handle()
    }

    pub(crate) async fn ack(&self, frame_type: FrameType, subtype: u8) -> std::io::Result<()> {
        let header = FrameHeader::new(frame_type, subtype, Action::Acknowledge);
        write_header_only(&self.writer_handle(), header).await
    }

    pub(crate) async fn ack_with_blob(
        &self,
        frame_type: FrameType,
        subtype: u8,
        blob: &[u8],
    ) -> std::io::Result<()> {
        let header = FrameHeader::new(frame_type, subtype, Action::Acknowledge);
        write_frame_with_blob(&self.writer_handle(), header, blob).await
    }

    pub(crate) async fn reject(
        &self,
        frame_type: FrameType,
        subtype: u8,
        code: RejectCode,
    ) -> std::io::Result<()> {
        let header = FrameHeader::new(frame_type, subtype, Action::Reject);
        let payload = RejectPayload { code: code.into() };
        write_frame(&self.writer_handle(), header, Some(&payload)).await
    }
}

/// Accepts ownership of a handshaked TLS stream and runs it to completion.
#[instrument(skip_all)]
pub async fn run_session(
    stream: TlsStream,
    users: Arc<UserDirectory>,
    rooms: Arc<RoomDirectory>,
    cancel: CancellationToken,
) {
    let transport = FrameTransport::new(stream);
    let mut session = Session::new(transport, users, rooms, cancel);
    run(&mut session).await;
    cleanup(&mut session).await;
}

async fn run(session: &mut Session) {
    loop {
        let header = match session.transport.read_header(&session.cancel).await {
            ReadOutcome::Header(h) => h,
            ReadOutcome::Idle => continue,
            ReadOutcome::Cancelled | ReadOutcome::Eof => return,
            ReadOutcome::Io(e) => {
                warn!("read failed: {e}");
                return;
            },
        };

        match step(session, header).await {
            HandlerOutcome::Ok => continue,
            HandlerOutcome::ConnectionFailure => return,
            HandlerOutcome::ThreadShutdown => return,
            HandlerOutcome::Failure => {
                error!("handler reported a fault, cancelling the server");
                session.cancel.cancel();
                return;
            },
        }
    }
}

/// Reads the payload for `header` (if any), checks state admissibility, and
/// dispatches to the matching handler.
async fn step(session: &mut Session, header: FrameHeader) -> HandlerOutcome {
    let (frame_type, subtype, action) = match (header.frame_type(), header.action()) {
        (Ok(ft), Ok(a)) => (ft, header.subtype, a),
        _ => return invalid_packet(session).await,
    };
    if action != Action::Request {
        return invalid_packet(session).await;
    }
    if !admissible(session.state, frame_type, subtype) {
        return invalid_packet(session).await;
    }

    let len = expected_payload_len(frame_type, subtype);
    let payload = if len > 0 {
        match session.transport.read_payload(len, &session.cancel).await {
            Ok(buf) => buf,
            Err(e) => {
                warn!("payload read failed: {e}");
                return HandlerOutcome::ConnectionFailure;
            },
        }
    } else {
        Vec::new()
    };

    match (frame_type, subtype) {
        (FrameType::Account, s) if s == opcode::account::REGISTER => {
            handlers::account::register(session, &payload).await
        },
        (FrameType::Account, s) if s == opcode::account::LOGIN => {
            handlers::account::login(session, &payload).await
        },
        (FrameType::Account, s) if s == opcode::account::LOGOUT => {
            handlers::account::logout(session, true).await
        },
        (FrameType::Account, s) if s == opcode::account::ADMIN => {
            handlers::account::set_admin(session, &payload, true).await
        },
        (FrameType::Account, s) if s == opcode::account::ADMIN_REMOVE => {
            handlers::account::set_admin(session, &payload, false).await
        },
        (FrameType::Account, s) if s == opcode::account::DEL => {
            handlers::account::delete(session, &payload).await
        },
        (FrameType::Rooms, s) if s == opcode::rooms::CREATE => {
            handlers::rooms::create(session, &payload).await
        },
        (FrameType::Rooms, s) if s == opcode::rooms::DEL => {
            handlers::rooms::delete(session, &payload).await
        },
        (FrameType::Rooms, s) if s == opcode::rooms::LIST => handlers::rooms::list(session).await,
        (FrameType::Rooms, s) if s == opcode::rooms::JOIN => {
            handlers::rooms::join(session, &payload).await
        },
        (FrameType::Chat, s) if s == opcode::chat::CHAT => {
            handlers::chat::chat(session, &payload).await
        },
        (FrameType::Chat, s) if s == opcode::chat::LEAVE => {
            handlers::chat::leave(session, true).await
        },
        (FrameType::Session, s) if s == opcode::session::QUIT => handlers::quit::quit(session).await,
        _ => invalid_packet(session).await,
    }
}

async fn invalid_packet(session: &Session) -> HandlerOutcome {
    match session
        .reject(FrameType::Fail, opcode::fail::FAIL, RejectCode::InvalidPacket)
        .await
    {
        Ok(()) => HandlerOutcome::Ok,
        Err(_) => HandlerOutcome::ConnectionFailure,
    }
}

/// Returns the admissibility table of §4.4: which (frame_type, subtype)
/// requests a session in `state` may receive.
fn admissible(state: SessionState, frame_type: FrameType, subtype: u8) -> bool {
    use opcode::{account, chat, rooms, session};
    match state {
        SessionState::Connected => matches!(
            (frame_type, subtype),
            (FrameType::Account, s) if s == account::REGISTER
        ) || matches!((frame_type, subtype), (FrameType::Account, s) if s == account::LOGIN)
            || matches!((frame_type, subtype), (FrameType::Session, s) if s == session::QUIT),
        SessionState::LoggedIn => matches!(
            (frame_type, subtype),
            (FrameType::Account, s)
                if s == account::ADMIN
                    || s == account::ADMIN_REMOVE
                    || s == account::DEL
                    || s == account::LOGOUT
        ) || matches!(
            (frame_type, subtype),
            (FrameType::Rooms, s) if s == rooms::LIST || s == rooms::JOIN || s == rooms::CREATE || s == rooms::DEL
        ) || matches!((frame_type, subtype), (FrameType::Session, s) if s == session::QUIT),
        SessionState::Chatting => matches!(
            (frame_type, subtype),
            (FrameType::Chat, s) if s == chat::CHAT || s == chat::LEAVE
        ) || matches!((frame_type, subtype), (FrameType::Session, s) if s == session::QUIT),
    }
}

fn expected_payload_len(frame_type: FrameType, subtype: u8) -> usize {
    use crate::protocol::frames::{ChatPayload, CredentialsPayload, RoomNamePayload, UsernamePayload};
    match (frame_type, subtype) {
        (FrameType::Account, s) if s == opcode::account::REGISTER || s == opcode::account::LOGIN => {
            payload_len::<CredentialsPayload>()
        },
        (FrameType::Account, s)
            if s == opcode::account::DEL || s == opcode::account::ADMIN || s == opcode::account::ADMIN_REMOVE =>
        {
            payload_len::<UsernamePayload>()
        },
        (FrameType::Rooms, s) if s == opcode::rooms::CREATE || s == opcode::rooms::DEL || s == opcode::rooms::JOIN => {
            payload_len::<RoomNamePayload>()
        },
        (FrameType::Chat, s) if s == opcode::chat::CHAT => payload_len::<ChatPayload>(),
        _ => 0,
    }
}

/// Cleanup invariant on session exit: silently LEAVE (if Chatting), then
/// silently LOGOUT (if logged in at all), with no acks sent for either step.
async fn cleanup(session: &mut Session) {
    if session.state == SessionState::Chatting {
        handlers::chat::leave(session, false).await;
    }
    if session.username.is_some() {
        handlers::account::logout(session, false).await;
    }
}
