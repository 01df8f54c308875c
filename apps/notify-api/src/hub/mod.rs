//! Real-time hub: wire model, transport primitives, session lifecycle, and
//! the WebSocket endpoint.

pub mod envelope;
pub mod server;
pub mod session;
pub mod transport;
