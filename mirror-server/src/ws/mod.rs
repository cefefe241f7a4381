//! WebSocket signaling endpoint

mod connection;
mod outbound;
mod protocol;

pub use connection::{SignalingHandler, ws_handler};
pub use outbound::Outbound;
pub use protocol::{ClientMessage, Inbound, ServerMessage, parse_client_message};
