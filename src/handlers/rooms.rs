//! ROOMS frame handlers: CREATE, DELETE, LIST, JOIN.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use crate::{
    error::HandlerOutcome,
    protocol::{codec::decode_payload, frames::RoomNamePayload, opcode, FrameType, RejectCode},
    session::{Session, SessionState},
};

async fn ack(session: &Session, subtype: u8) -> HandlerOutcome {
    match session.ack(FrameType::Rooms, subtype).await {
        Ok(()) => HandlerOutcome::Ok,
        Err(_) => HandlerOutcome::ConnectionFailure,
    }
}

async fn reject(session: &Session, subtype: u8, code: RejectCode) -> HandlerOutcome {
    match session.reject(FrameType::Rooms, subtype, code).await {
        Ok(()) => HandlerOutcome::Ok,
        Err(_) => HandlerOutcome::ConnectionFailure,
    }
}

async fn decode_room_name(session: &Session, subtype: u8, payload: &[u8]) -> Result<String, HandlerOutcome> {
    let name_payload = decode_payload::<RoomNamePayload>(payload)
        .map_err(|_| ())
        .and_then(|p| p.room_name.as_str().map(str::to_string).map_err(|_| ()));
    match name_payload {
        Ok(name) => Ok(name),
        Err(()) => Err(reject(session, subtype, RejectCode::InvalidPacket).await),
    }
}

/// Admin-only: rejection order is privilege first, matching §4.6.
pub async fn create(session: &mut Session, payload: &[u8]) -> HandlerOutcome {
    let subtype = opcode::rooms::CREATE;
    let Some(requester) = session.username.clone() else {
        return reject(session, subtype, RejectCode::AdminPriv).await;
    };
    if !session.users.is_admin(&requester).await {
        return reject(session, subtype, RejectCode::AdminPriv).await;
    }
    let name = match decode_room_name(session, subtype, payload).await {
        Ok(n) => n,
        Err(outcome) => return outcome,
    };

    match session.rooms.create(&name).await {
        Ok(()) => ack(session, subtype).await,
        Err(code) => reject(session, subtype, code).await,
    }
}

pub async fn delete(session: &mut Session, payload: &[u8]) -> HandlerOutcome {
    let subtype = opcode::rooms::DEL;
    let Some(requester) = session.username.clone() else {
        return reject(session, subtype, RejectCode::AdminPriv).await;
    };
    if !session.users.is_admin(&requester).await {
        return reject(session, subtype, RejectCode::AdminPriv).await;
    }
    let name = match decode_room_name(session, subtype, payload).await {
        Ok(n) => n,
        Err(outcome) => return outcome,
    };

    match session.rooms.delete(&name).await {
        Ok(()) => ack(session, subtype).await,
        Err(code) => reject(session, subtype, code).await,
    }
}

pub async fn list(session: &mut Session) -> HandlerOutcome {
    let subtype = opcode::rooms::LIST;
    match session.rooms.list().await {
        Ok(blob) => match session.ack_with_blob(FrameType::Rooms, subtype, &blob).await {
            Ok(()) => HandlerOutcome::Ok,
            Err(_) => HandlerOutcome::ConnectionFailure,
        },
        Err(code) => reject(session, subtype, code).await,
    }
}

pub async fn join(session: &mut Session, payload: &[u8]) -> HandlerOutcome {
    let subtype = opcode::rooms::JOIN;
    let name = match decode_room_name(session, subtype, payload).await {
        Ok(n) => n,
        Err(outcome) => return outcome,
    };
    let Some(username) = session.username.clone() else {
        return reject(session, subtype, RejectCode::UserDoesNotExist).await;
    };

    let writer = session.writer_handle();
    let (room, log) = match session.rooms.join(&username, writer, &name).await {
        Ok(pair) => pair,
        Err(code) => return reject(session, subtype, code).await,
    };

    session.users.set_current_room(&username, Some(name)).await;
    session.room = Some(Arc::clone(&room));
    session.state = SessionState::Chatting;

    let ack_outcome = match session.ack_with_blob(FrameType::Rooms, subtype, &log).await {
        Ok(()) => HandlerOutcome::Ok,
        Err(_) => return HandlerOutcome::ConnectionFailure,
    };

    let announce = format!("{username} has joined the room");
    let fan_out_outcome = room.broadcast_system(&username, &announce, &username).await;
    ack_outcome.worse_of(fan_out_outcome)
}
