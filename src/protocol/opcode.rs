//! The second and third header bytes: `frame_type` picks a namespace for
//! `subtype`, and `action` says whether this is a request, a response, a
//! reject, a plain acknowledge, or an unsolicited update.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// Top-level frame namespace (first header byte).
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Rooms = 0,
    Account = 1,
    Chat = 2,
    Session = 3,
    Fail = 255,
}

#[derive(Debug, Error)]
#[error("unknown frame type: 0x{0:02x}")]
pub struct UnknownFrameType(pub u8);

impl TryFrom<u8> for FrameType {
    type Error = UnknownFrameType;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        Ok(match b {
            0 => Self::Rooms,
            1 => Self::Account,
            2 => Self::Chat,
            3 => Self::Session,
            255 => Self::Fail,
            other => return Err(UnknownFrameType(other)),
        })
    }
}

/// Third header byte: what kind of message this is.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Request = 0,
    Response = 1,
    Reject = 2,
    Acknowledge = 3,
    Update = 4,
}

#[derive(Debug, Error)]
#[error("unknown action: 0x{0:02x}")]
pub struct UnknownAction(pub u8);

impl TryFrom<u8> for Action {
    type Error = UnknownAction;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        Ok(match b {
            0 => Self::Request,
            1 => Self::Response,
            2 => Self::Reject,
            3 => Self::Acknowledge,
            4 => Self::Update,
            other => return Err(UnknownAction(other)),
        })
    }
}

/// Subtypes for `FrameType::Account`.
pub mod account {
    pub const REGISTER: u8 = 0;
    pub const DEL: u8 = 1;
    pub const LOGIN: u8 = 2;
    pub const ADMIN: u8 = 3;
    pub const ADMIN_REMOVE: u8 = 4;
    pub const LOGOUT: u8 = 5;
}

/// Subtypes for `FrameType::Rooms`.
pub mod rooms {
    pub const CREATE: u8 = 0;
    pub const DEL: u8 = 1;
    pub const LIST: u8 = 2;
    pub const JOIN: u8 = 3;
}

/// Subtypes for `FrameType::Chat`.
pub mod chat {
    pub const CHAT: u8 = 0;
    pub const LEAVE: u8 = 1;
}

/// Subtypes for `FrameType::Session`.
pub mod session {
    pub const QUIT: u8 = 0;
}

/// Subtypes for `FrameType::Fail`.
pub mod fail {
    pub const FAIL: u8 = 0;
}
