// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::protocol::opcode::{Action, FrameType};

/// Every frame on the wire begins with this 3-byte header.
pub const HEADER_LEN: usize = 3;

/// `{type, subtype, opcode}` triple that prefixes every frame.
///
/// `subtype` is interpreted relative to `frame_type`; see
/// [`crate::protocol::opcode`] for the per-type constants.
#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    pub frame_type: u8,
    pub subtype: u8,
    pub action: u8,
}

impl FrameHeader {
    pub fn new(frame_type: FrameType, subtype: u8, action: Action) -> Self {
        Self {
            frame_type: frame_type as u8,
            subtype,
            action: action as u8,
        }
    }

    pub fn from_bytes(buf: [u8; HEADER_LEN]) -> Self {
        Self {
            frame_type: buf[0],
            subtype: buf[1],
            action: buf[2],
        }
    }

    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        [self.frame_type, self.subtype, self.action]
    }

    pub fn frame_type(&self) -> Result<FrameType, crate::protocol::UnknownFrameType> {
        FrameType::try_from(self.frame_type)
    }

    pub fn action(&self) -> Result<Action, crate::protocol::UnknownAction> {
        Action::try_from(self.action)
    }
}
