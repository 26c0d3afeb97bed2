use std::time::Duration;

use actix_web::{http::StatusCode, test::TestRequest, web::Bytes};
use awc::ws::{CloseCode, Frame, Message};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use settle_engine::Room;

use super::helpers::{test_app, TestApp, BILL_ID, BUSINESS_ID};

type Socket = actix_codec::Framed<awc::BoxedSocket, awc::ws::Codec>;

async fn open_socket(addr: &str, rooms: &str) -> Socket {
    let (res, socket) = awc::Client::new().ws(format!("ws://{addr}/ws?rooms={rooms}")).connect().await.unwrap();
    assert_eq!(res.status(), StatusCode::SWITCHING_PROTOCOLS);
    socket
}

async fn next_frame(socket: &mut Socket) -> Frame {
    let frame = tokio::time::timeout(Duration::from_secs(2), socket.next()).await.expect("no frame within 2s");
    frame.expect("socket has ended").expect("bad frame")
}

async fn wait_for_connections(app: &TestApp, expected: usize) -> usize {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let n = app.hub.connection_count().await.unwrap();
        if n == expected || tokio::time::Instant::now() > deadline {
            return n;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[actix_web::test]
async fn websocket_route_requires_an_upgrade() {
    let app = test_app();
    let (status, _) = app.call(TestRequest::get().uri("/ws?rooms=bill:7")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.hub.connection_count().await.unwrap(), 0);
}

#[actix_web::test]
async fn viewers_receive_their_rooms_messages() {
    let app = test_app();
    let addr = app.serve();
    let mut socket = open_socket(&addr, "bill:7").await;
    assert_eq!(app.hub.room_size(&Room::bill(BILL_ID)).await.unwrap(), 1);

    app.hub.broadcast_to_room(&Room::bill(8), &json!({ "type": "bill_update", "bill_id": 8 })).await.unwrap();
    app.hub.broadcast_to_room(&Room::bill(BILL_ID), &json!({ "type": "bill_update", "bill_id": 7 })).await.unwrap();
    app.hub.broadcast_all(&json!({ "type": "announcement" })).await.unwrap();
    let Frame::Text(text) = next_frame(&mut socket).await else { panic!("expected a text frame") };
    let msg: serde_json::Value = serde_json::from_slice(&text).unwrap();
    assert_eq!(msg["bill_id"], 7);
    let Frame::Text(text) = next_frame(&mut socket).await else { panic!("expected a text frame") };
    let msg: serde_json::Value = serde_json::from_slice(&text).unwrap();
    assert_eq!(msg["type"], "announcement");

    socket.send(Message::Ping(Bytes::from_static(b"still there?"))).await.unwrap();
    match next_frame(&mut socket).await {
        Frame::Pong(bytes) => assert_eq!(bytes.as_ref(), b"still there?"),
        other => panic!("expected a pong, got {other:?}"),
    }

    // closing the socket removes the connection from the hub
    socket.send(Message::Close(None)).await.unwrap();
    assert_eq!(wait_for_connections(&app, 0).await, 0);
}

#[actix_web::test]
async fn hub_dropping_a_connection_closes_its_socket() {
    let app = test_app();
    let addr = app.serve();
    let mut dropped = open_socket(&addr, "bill:7").await;
    let mut staff = open_socket(&addr, &format!("business:{BUSINESS_ID}")).await;
    assert_eq!(app.hub.connection_count().await.unwrap(), 2);

    // the first connection on a fresh hub is #1
    app.hub.unregister(1).await.unwrap();
    match next_frame(&mut dropped).await {
        Frame::Close(Some(reason)) => assert_eq!(reason.code, CloseCode::Away),
        other => panic!("expected a close frame, got {other:?}"),
    }
    assert_eq!(app.hub.connection_count().await.unwrap(), 1);

    app.hub.shutdown().await;
    match next_frame(&mut staff).await {
        Frame::Close(Some(reason)) => assert_eq!(reason.code, CloseCode::Away),
        other => panic!("expected a close frame, got {other:?}"),
    }
}
