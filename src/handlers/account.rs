//! ACCOUNT frame handlers: REGISTER, LOGIN, LOGOUT, ADMIN/ADMIN_REMOVE, DEL.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use crate::{
    error::HandlerOutcome,
    protocol::{
        codec::decode_payload,
        frames::{CredentialsPayload, UsernamePayload},
        opcode, FrameType, RejectCode,
    },
    session::{Session, SessionState},
};

async fn ack(session: &Session, subtype: u8) -> HandlerOutcome {
    match session.ack(FrameType::Account, subtype).await {
        Ok(()) => HandlerOutcome::Ok,
        Err(_) => HandlerOutcome::ConnectionFailure,
    }
}

async fn reject(session: &Session, subtype: u8, code: RejectCode) -> HandlerOutcome {
    match session.reject(FrameType::Account, subtype, code).await {
        Ok(()) => HandlerOutcome::Ok,
        Err(_) => HandlerOutcome::ConnectionFailure,
    }
}

pub async fn register(session: &mut Session, payload: &[u8]) -> HandlerOutcome {
    let subtype = opcode::account::REGISTER;
    let creds = match decode_payload::<CredentialsPayload>(payload) {
        Ok(c) => c,
        Err(_) => return reject(session, subtype, RejectCode::InvalidPacket).await,
    };
    let (username, password) = match (creds.username.as_str(), creds.password.as_str()) {
        (Ok(u), Ok(p)) => (u, p),
        _ => return reject(session, subtype, RejectCode::InvalidPacket).await,
    };

    match session.users.register(username, password).await {
        Ok(()) => ack(session, subtype).await,
        Err(code) => reject(session, subtype, code).await,
    }
}

pub async fn login(session: &mut Session, payload: &[u8]) -> HandlerOutcome {
    let subtype = opcode::account::LOGIN;
    let creds = match decode_payload::<CredentialsPayload>(payload) {
        Ok(c) => c,
        Err(_) => return reject(session, subtype, RejectCode::InvalidPacket).await,
    };
    let (username, password) = match (creds.username.as_str(), creds.password.as_str()) {
        (Ok(u), Ok(p)) => (u.to_string(), p.to_string()),
        _ => return reject(session, subtype, RejectCode::InvalidPacket).await,
    };

    let writer = session.writer_handle();
    match session.users.login(&username, &password, writer).await {
        Ok(()) => {
            session.username = Some(username);
            session.state = SessionState::LoggedIn;
            ack(session, subtype).await
        },
        Err(code) => reject(session, subtype, code).await,
    }
}

/// Marks the session's user out. Suppresses the ack when called as part of
/// QUIT or session-exit cleanup.
pub async fn logout(session: &mut Session, send_ack: bool) -> HandlerOutcome {
    let username = match session.username.take() {
        Some(u) => u,
        None => return HandlerOutcome::Ok,
    };

    let result = session.users.logout(&username).await;
    session.state = SessionState::Connected;
    session.room = None;

    if !send_ack {
        return HandlerOutcome::Ok;
    }
    match result {
        Ok(()) => ack(session, opcode::account::LOGOUT).await,
        Err(code) => reject(session, opcode::account::LOGOUT, code).await,
    }
}

pub async fn set_admin(session: &mut Session, payload: &[u8], make_admin: bool) -> HandlerOutcome {
    let subtype = if make_admin { opcode::account::ADMIN } else { opcode::account::ADMIN_REMOVE };

    let name_payload = match decode_payload::<UsernamePayload>(payload) {
        Ok(p) => p,
        Err(_) => return reject(session, subtype, RejectCode::InvalidPacket).await,
    };
    let target = match name_payload.username.as_str() {
        Ok(t) => t.to_string(),
        Err(_) => return reject(session, subtype, RejectCode::InvalidPacket).await,
    };
    let Some(requester) = session.username.clone() else {
        return reject(session, subtype, RejectCode::AdminPriv).await;
    };

    match session.users.set_admin(&requester, &target, make_admin).await {
        Ok(()) => ack(session, subtype).await,
        Err(code) => reject(session, subtype, code).await,
    }
}

pub async fn delete(session: &mut Session, payload: &[u8]) -> HandlerOutcome {
    let subtype = opcode::account::DEL;
    let name_payload = match decode_payload::<UsernamePayload>(payload) {
        Ok(p) => p,
        Err(_) => return reject(session, subtype, RejectCode::InvalidPacket).await,
    };
    let target = match name_payload.username.as_str() {
        Ok(t) => t.to_string(),
        Err(_) => return reject(session, subtype, RejectCode::InvalidPacket).await,
    };
    let Some(requester) = session.username.clone() else {
        return reject(session, subtype, RejectCode::AdminPriv).await;
    };

    match session.users.delete(&requester, &target).await {
        Ok(()) => ack(session, subtype).await,
        Err(code) => reject(session, subtype, code).await,
    }
}
