//! Real-time messaging subsystem.
//!
//! Sockets connect by WebSocket upgrade on the configured path of the
//! shared listener. The subsystem offers a connect handshake and an event
//! relay between connected sockets; it has no HTTP-style routing.

pub mod hub;
pub mod socket;

pub use hub::Hub;
pub use socket::router;
