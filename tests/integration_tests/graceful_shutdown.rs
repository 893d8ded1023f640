//! Scenario: several logged-in sessions are in flight when the server is
//! asked to shut down; every connection should observe a clean close and the
//! rooms directory should be torn down.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use chatroom_server::protocol::{frames::CredentialsPayload, opcode, FrameType};

use super::common::TestServer;

#[tokio::test]
async fn shutdown_closes_every_live_session_and_removes_the_rooms_directory() {
    const CLIENTS: usize = 3;

    let server = TestServer::start(CLIENTS as u32, 4)
        .await
        .unwrap_or_else(|e| panic!("start server: {e}"));

    let mut clients = Vec::with_capacity(CLIENTS);
    for i in 0..CLIENTS {
        let username = format!("user{i}");
        let mut client = server.connect().await.expect("connect");
        let creds = CredentialsPayload::new(&username, "hunter22").expect("valid credentials");
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
        clients.push(client);
    }

    let rooms_dir = server.rooms_dir();
    server.shutdown().await.expect("graceful shutdown");

    for mut client in clients {
        assert!(client.expect_closed().await.expect("each session should observe a clean close"));
    }

    assert!(!tokio::fs::try_exists(&rooms_dir).await.unwrap_or(true));
}
