//! Fixed-layout payloads that follow a [`crate::protocol::FrameHeader`].

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::protocol::fields::{FieldError, FixedStr};

/// `username[31] + password[31]`, used by REGISTER and LOGIN requests.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct CredentialsPayload {
    pub username: FixedStr<31>,
    pub password: FixedStr<31>,
}

impl CredentialsPayload {
    pub fn new(username: &str, password: &str) -> Result<Self, FieldError> {
        Ok(Self {
            username: FixedStr::new(username)?,
            password: FixedStr::new(password)?,
        })
    }
}

/// `username[31]`, used by DELETE, ADMIN, ADMIN_REMOVE requests.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct UsernamePayload {
    pub username: FixedStr<31>,
}

impl UsernamePayload {
    pub fn new(username: &str) -> Result<Self, FieldError> {
        Ok(Self {
            username: FixedStr::new(username)?,
        })
    }
}

/// `room_name[31]`, used by room CREATE, DELETE, JOIN requests.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct RoomNamePayload {
    pub room_name: FixedStr<31>,
}

impl RoomNamePayload {
    pub fn new(room_name: &str) -> Result<Self, FieldError> {
        Ok(Self {
            room_name: FixedStr::new(room_name)?,
        })
    }
}

/// 1-byte REJECT payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct RejectPayload {
    pub code: u8,
}

/// `username[30] + '>' + chat[150] + NUL`, carried by both a client's CHAT
/// request and the server's CHAT UPDATE broadcast.
pub const CHAT_PAYLOAD_LEN: usize = 182;
const CHAT_USERNAME_LEN: usize = 30;
const CHAT_MESSAGE_LEN: usize = 150;
const CHAT_DELIMITER: u8 = b'>';

#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct ChatPayload {
    username: [u8; CHAT_USERNAME_LEN],
    delimiter: u8,
    message: [u8; CHAT_MESSAGE_LEN],
    terminator: u8,
}

impl ChatPayload {
    pub fn new(username: &str, message: &str) -> Result<Self, FieldError> {
        let username_bytes = username.as_bytes();
        if username_bytes.len() > CHAT_USERNAME_LEN {
            return Err(FieldError::TooLong {
                max: CHAT_USERNAME_LEN,
                len: username_bytes.len(),
            });
        }
        let message_bytes = message.as_bytes();
        if message_bytes.len() > CHAT_MESSAGE_LEN - 1 {
            return Err(FieldError::TooLong {
                max: CHAT_MESSAGE_LEN - 1,
                len: message_bytes.len(),
            });
        }
        for &b in username_bytes.iter().chain(message_bytes) {
            if !(33..=126).contains(&b) && b != b' ' {
                return Err(FieldError::BadChar(b));
            }
        }

        let mut username_buf = [0u8; CHAT_USERNAME_LEN];
        username_buf[..username_bytes.len()].copy_from_slice(username_bytes);
        let mut message_buf = [0u8; CHAT_MESSAGE_LEN];
        message_buf[..message_bytes.len()].copy_from_slice(message_bytes);

        Ok(Self {
            username: username_buf,
            delimiter: CHAT_DELIMITER,
            message: message_buf,
            terminator: 0,
        })
    }

    pub fn username(&self) -> Result<&str, FieldError> {
        decode_nul_padded(&self.username)
    }

    /// Ignores whatever is actually in the terminator byte; the message
    /// content is everything before the first NUL within the 150-byte field.
    pub fn message(&self) -> Result<&str, FieldError> {
        decode_nul_padded(&self.message)
    }
}

fn decode_nul_padded(buf: &[u8]) -> Result<&str, FieldError> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    std::str::from_utf8(&buf[..end]).map_err(|_| FieldError::BadChar(0))
}
