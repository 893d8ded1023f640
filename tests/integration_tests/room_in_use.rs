//! Scenario: deleting a room with a member still present is refused; once
//! the room empties out, the same delete succeeds.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use chatroom_server::protocol::{
    frames::{CredentialsPayload, RoomNamePayload},
    opcode, FrameType, RejectCode,
};

use super::common::TestServer;

#[tokio::test]
async fn delete_is_refused_while_occupied_then_succeeds_once_empty() {
    let server = TestServer::start_with_seed(4, 4, "admin:rootpass1\n")
        .await
        .unwrap_or_else(|e| panic!("start server: {e}"));

    let mut admin = server.connect().await.expect("connect admin");
    let admin_creds = CredentialsPayload::new("admin", "rootpass1").expect("valid credentials");
    admin
        .send_request(FrameType::Account, opcode::account::LOGIN, Some(&admin_creds))
        .await
        .expect("send admin login");
    admin
        .expect_ack(FrameType::Account, opcode::account::LOGIN)
        .await
        .expect("admin login acked");

    let room_name = RoomNamePayload::new("lobby").expect("valid room name");
    admin
        .send_request(FrameType::Rooms, opcode::rooms::CREATE, Some(&room_name))
        .await
        .expect("send create");
    admin
        .expect_ack(FrameType::Rooms, opcode::rooms::CREATE)
        .await
        .expect("create acked");

    let mut alice = server.connect().await.expect("connect alice");
    let alice_creds = CredentialsPayload::new("alice", "hunter22").expect("valid credentials");
    alice
        .send_request(FrameType::Account, opcode::account::REGISTER, Some(&alice_creds))
        .await
        .expect("send register");
    alice
        .expect_ack(FrameType::Account, opcode::account::REGISTER)
        .await
        .expect("register acked");
    alice
        .send_request(FrameType::Account, opcode::account::LOGIN, Some(&alice_creds))
        .await
        .expect("send login");
    alice
        .expect_ack(FrameType::Account, opcode::account::LOGIN)
        .await
        .expect("login acked");
    alice
        .send_request(FrameType::Rooms, opcode::rooms::JOIN, Some(&room_name))
        .await
        .expect("send join");
    alice
        .expect_ack_with_blob(FrameType::Rooms, opcode::rooms::JOIN)
        .await
        .expect("join acked");

    admin
        .send_request(FrameType::Rooms, opcode::rooms::DEL, Some(&room_name))
        .await
        .expect("send delete while occupied");
    admin
        .expect_reject(FrameType::Rooms, opcode::rooms::DEL, RejectCode::RoomInUse)
        .await
        .expect("delete refused while occupied");

    alice
        .send_header_only(FrameType::Chat, opcode::chat::LEAVE)
        .await
        .expect("send leave");
    alice
        .expect_ack(FrameType::Chat, opcode::chat::LEAVE)
        .await
        .expect("leave acked");

    admin
        .send_request(FrameType::Rooms, opcode::rooms::DEL, Some(&room_name))
        .await
        .expect("send delete once empty");
    admin
        .expect_ack(FrameType::Rooms, opcode::rooms::DEL)
        .await
        .expect("delete acked once empty");

    let log_path = server.rooms_dir().join("lobby.log");
    assert!(!tokio::fs::try_exists(&log_path).await.unwrap_or(true));

    let names = tokio::fs::read_to_string(server.rooms_dir().join("room_names.log"))
        .await
        .expect("read room_names.log");
    assert_eq!(names, "");

    server.shutdown().await.expect("shutdown");
}
