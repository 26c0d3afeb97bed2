//! Live notification fan-out.
//!
//! A single [`ConnectionHub`] task owns every registered connection. Everything else talks to it through a
//! cloneable [`HubHandle`], so connection membership is only ever changed by the hub loop itself.
//!
//! Viewers declare the [`Room`]s they are interested in when they register. A broadcast to a room is delivered to
//! every connection whose interest set contains that room, by scanning the connection set. Each connection has a
//! bounded outbound queue. A connection whose queue is full is dropped on the spot, rather than making the broadcaster
//! wait for it.
mod connection_hub;
mod errors;
mod notifications;
mod room;

pub use connection_hub::{ConnectionHub, ConnectionId, HubConfig, HubHandle, Subscriber};
pub use errors::HubError;
pub use notifications::Notification;
pub use room::Room;
