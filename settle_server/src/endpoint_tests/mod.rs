mod chain_events;
mod helpers;
mod split;
mod websocket;
