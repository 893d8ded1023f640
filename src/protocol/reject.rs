// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// One-byte reject codes carried by a REJECT frame's payload.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCode {
    SrvBusy = 0,
    SrvErr = 1,
    InvalidPacket = 2,
    UserNameLen = 3,
    UserNameChar = 4,
    PassLen = 5,
    PassChar = 6,
    UserDoesNotExist = 7,
    IncorrectPass = 8,
    AdminPriv = 9,
    UserExists = 10,
    RoomExists = 11,
    UserLoggedIn = 12,
    AdminSelf = 13,
    MaxUsers = 14,
    MaxClients = 15,
    MaxRooms = 16,
    NoRooms = 17,
    RoomLen = 18,
    RoomChars = 19,
    RoomDoesNotExist = 21,
    RoomInUse = 22,
}

#[derive(Debug, Error)]
#[error("unknown reject code: {0}")]
pub struct UnknownRejectCode(pub u8);

impl TryFrom<u8> for RejectCode {
    type Error = UnknownRejectCode;

    fn try_from(b: u8) -> Result<Self, Self::Error> {
        Ok(match b {
            0 => Self::SrvBusy,
            1 => Self::SrvErr,
            2 => Self::InvalidPacket,
            3 => Self::UserNameLen,
            4 => Self::UserNameChar,
            5 => Self::PassLen,
            6 => Self::PassChar,
            7 => Self::UserDoesNotExist,
            8 => Self::IncorrectPass,
            9 => Self::AdminPriv,
            10 => Self::UserExists,
            11 => Self::RoomExists,
            12 => Self::UserLoggedIn,
            13 => Self::AdminSelf,
            14 => Self::MaxUsers,
            15 => Self::MaxClients,
            16 => Self::MaxRooms,
            17 => Self::NoRooms,
            18 => Self::RoomLen,
            19 => Self::RoomChars,
            21 => Self::RoomDoesNotExist,
            22 => Self::RoomInUse,
            other => return Err(UnknownRejectCode(other)),
        })
    }
}

impl From<RejectCode> for u8 {
    fn from(r: RejectCode) -> u8 {
        r as u8
    }
}
