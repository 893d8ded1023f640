//! CHAT frame handlers: CHAT, LEAVE.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    error::HandlerOutcome,
    protocol::{codec::decode_payload, frames::ChatPayload, opcode, FrameType, RejectCode},
    session::{Session, SessionState},
};

async fn ack(session: &Session, subtype: u8) -> HandlerOutcome {
    match session.ack(FrameType::Chat, subtype).await {
        Ok(()) => HandlerOutcome::Ok,
        Err(_) => HandlerOutcome::ConnectionFailure,
    }
}

async fn reject(session: &Session, subtype: u8, code: RejectCode) -> HandlerOutcome {
    match session.reject(FrameType::Chat, subtype, code).await {
        Ok(()) => HandlerOutcome::Ok,
        Err(_) => HandlerOutcome::ConnectionFailure,
    }
}

pub async fn chat(session: &mut Session, payload: &[u8]) -> HandlerOutcome {
    let subtype = opcode::chat::CHAT;
    let frame = match decode_payload::<ChatPayload>(payload) {
        Ok(p) => p,
        Err(_) => return reject(session, subtype, RejectCode::InvalidPacket).await,
    };
    let message = match frame.message() {
        Ok(m) => m.to_string(),
        Err(_) => return reject(session, subtype, RejectCode::InvalidPacket).await,
    };
    let Some(username) = session.username.clone() else {
        return reject(session, subtype, RejectCode::UserDoesNotExist).await;
    };
    let Some(room) = session.room.clone() else {
        return reject(session, subtype, RejectCode::RoomDoesNotExist).await;
    };

    // No reply to the sender: only the other members get a CHAT UPDATE.
    match room.broadcast_chat(&username, &message).await {
        Ok(fan_out_outcome) => fan_out_outcome,
        Err(code) => reject(session, subtype, code).await,
    }
}

/// Removes the session's user from its current room. Suppresses the ack when
/// called as part of session-exit cleanup.
pub async fn leave(session: &mut Session, send_ack: bool) -> HandlerOutcome {
    let Some(room) = session.room.take() else {
        return HandlerOutcome::Ok;
    };
    let Some(username) = session.username.clone() else {
        return HandlerOutcome::Ok;
    };

    room.leave(&username).await;
    session.users.set_current_room(&username, None).await;
    session.state = SessionState::LoggedIn;

    let announce = format!("{username} has left the room");
    let fan_out_outcome = room.broadcast_system(&username, &announce, &username).await;

    if !send_ack {
        return fan_out_outcome;
    }
    ack(session, opcode::chat::LEAVE).await.worse_of(fan_out_outcome)
}
