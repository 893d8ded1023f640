//! Scenario: a member leaves a room; the departing member gets an ack and the
//! remaining member gets a "has left the room" announcement.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use chatroom_server::protocol::{
    frames::{CredentialsPayload, RoomNamePayload},
    opcode, FrameType,
};

use super::common::{ClientConn, TestServer};

async fn register_login(client: &mut ClientConn, username: &str, password: &str) {
    let creds = CredentialsPayload::new(username, password).expect("valid credentials");
    client
        .send_request(FrameType::Account, opcode::account::REGISTER, Some(&creds))
        .await
        .expect("send register");
    client
        .expect_ack(FrameType::Account, opcode::account::REGISTER)
        .await
        .expect("register acked");
    client
        .send_request(FrameType::Account, opcode::account::LOGIN, Some(&creds))
        .await
        .expect("send login");
    client
        .expect_ack(FrameType::Account, opcode::account::LOGIN)
        .await
        .expect("login acked");
}

#[tokio::test]
async fn leaving_a_room_acks_the_leaver_and_announces_to_peers() {
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
    register_login(&mut alice, "alice", "hunter22").await;
    alice
        .send_request(FrameType::Rooms, opcode::rooms::JOIN, Some(&room_name))
        .await
        .expect("send join");
    alice
        .expect_ack_with_blob(FrameType::Rooms, opcode::rooms::JOIN)
        .await
        .expect("join acked");

    let mut bob = server.connect().await.expect("connect bob");
    register_login(&mut bob, "bob", "hunterbb").await;
    bob.send_request(FrameType::Rooms, opcode::rooms::JOIN, Some(&room_name))
        .await
        .expect("send join");
    bob.expect_ack_with_blob(FrameType::Rooms, opcode::rooms::JOIN)
        .await
        .expect("join acked");

    let (sender, _) = alice.expect_chat_update().await.expect("join announcement");
    assert_eq!(sender, "bob");

    bob.send_header_only(FrameType::Chat, opcode::chat::LEAVE)
        .await
        .expect("send leave");

    let (sender, body) = alice.expect_chat_update().await.expect("leave announcement");
    assert_eq!(sender, "bob");
    assert_eq!(body, "bob has left the room");

    bob.expect_ack(FrameType::Chat, opcode::chat::LEAVE)
        .await
        .expect("leave acked");

    server.shutdown().await.expect("shutdown");
}
