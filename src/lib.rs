//! Pure Rust async client for the [Source RCON protocol](https://developer.valvesoftware.com/wiki/Source_RCON_Protocol).
//!
//! [packet] encodes and decodes frames, [client] runs the connect,
//! authenticate, execute, close lifecycle on top of any [transport].
pub mod client;
pub mod error;
pub mod packet;
pub mod transport;

pub use client::{Client, State};
pub use error::RconError;
pub use packet::{Packet, PacketType};
pub use transport::{TcpTransport, Transport};
