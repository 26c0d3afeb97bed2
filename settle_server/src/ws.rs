//! The WebSocket side of the connection hub.
//!
//! Each upgraded socket is registered with the hub and then served by a single task on the worker that accepted it.
//! The task forwards everything the hub queues for the connection to the socket, and watches the socket for pings and
//! for the peer going away. Whichever side ends first tears the other down: a closed socket unregisters the
//! connection, and a connection dropped by the hub (slow reader, shutdown) closes the socket.
use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::{CloseCode, CloseReason, Message, MessageStream, Session};
use futures::StreamExt;
use log::*;
use settle_engine::{hub::Subscriber, HubHandle, Room};

use crate::errors::ServerError;

pub async fn connect(
    req: &HttpRequest,
    body: web::Payload,
    hub: HubHandle,
    rooms: Vec<Room>,
) -> Result<HttpResponse, ServerError> {
    let (response, session, stream) = actix_ws::handle(req, body)
        .map_err(|e| ServerError::InvalidRequestBody(format!("Could not upgrade to a WebSocket. {e}")))?;
    let subscriber = hub.register(rooms).await?;
    info!("📡️ WebSocket connection #{} opened", subscriber.id);
    actix_web::rt::spawn(pump(hub, subscriber, session, stream));
    Ok(response)
}

enum Ending {
    PeerClosed,
    HubClosed,
    Failed(String),
}

async fn pump(hub: HubHandle, mut subscriber: Subscriber, mut session: Session, mut stream: MessageStream) {
    let id = subscriber.id;
    let ending = loop {
        tokio::select! {
            outbound = subscriber.recv() => match outbound {
                Some(payload) => {
                    if session.text(payload.to_string()).await.is_err() {
                        break Ending::PeerClosed;
                    }
                },
                None => break Ending::HubClosed,
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Ping(bytes))) => {
                    if session.pong(&bytes).await.is_err() {
                        break Ending::PeerClosed;
                    }
                },
                Some(Ok(Message::Close(reason))) => {
                    trace!("📡️ Connection #{id} sent close: {reason:?}");
                    break Ending::PeerClosed;
                },
                // Clients only listen. Anything else they send is ignored.
                Some(Ok(_)) => {},
                Some(Err(e)) => break Ending::Failed(e.to_string()),
                None => break Ending::PeerClosed,
            },
        }
    };
    let reason = match ending {
        Ending::PeerClosed => {
            debug!("📡️ Connection #{id} was closed by the client");
            None
        },
        Ending::HubClosed => {
            debug!("📡️ Connection #{id} was dropped by the hub");
            Some(CloseReason { code: CloseCode::Away, description: Some("Connection dropped by server".into()) })
        },
        Ending::Failed(e) => {
            warn!("📡️ Connection #{id} failed. {e}");
            Some(CloseReason { code: CloseCode::Protocol, description: None })
        },
    };
    if let Err(e) = hub.unregister(id).await {
        trace!("📡️ Could not unregister connection #{id}. {e}");
    }
    let _ = session.close(reason).await;
    info!("📡️ WebSocket connection #{id} closed");
}
