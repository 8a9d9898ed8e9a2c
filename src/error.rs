use thiserror::Error;
use tokio::time::error::Elapsed;

/// Possible errors for the package.
///
/// A rejected password is not an error: [crate::client::Client::authenticate]
/// returns `Ok(false)` for that.
#[derive(Error, Debug)]
pub enum RconError {
    /// Returned for an empty password or command, or a body the wire format
    /// cannot carry. Nothing has been sent when this is returned.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Returned if an operation is called in the wrong session state, e.g.
    /// executing a command before authenticating.
    #[error("illegal state: {0}")]
    IllegalState(&'static str),
    /// Returned if we received a packet that does not have a type known to us.
    #[error("unknown rcon packet type: {0}")]
    UnknownPacketType(i32),
    /// Returned if the frame is mangled in some way (short header, size field
    /// disagreeing with the bytes read, missing terminator).
    #[error("malformed packet: {0}")]
    MalformedPacket(String),
    /// Returned if the body is mangled in some way.
    #[error("packet body malformed (not valid ascii or utf-8)")]
    MalformedPacketBody(#[from] std::str::Utf8Error),
    /// Returned if the host is down or behind a firewall.
    #[error("host cannot be reached")]
    UnreachableHost(#[source] std::io::Error),
    /// Returned by a transport asked to do I/O before it was connected.
    #[error("transport is not connected")]
    NotConnected,
    /// The stream was established, but there was a problem writing to the
    /// socket.
    #[error("cannot send message to host")]
    SendError(#[source] std::io::Error),
    /// The stream was established, but there was a problem reading from the
    /// socket.
    #[error("cannot receive response from host")]
    ReceiveError(#[source] std::io::Error),
    /// Returned if the server did not respond in time.
    #[error("timeout")]
    TimeoutError(#[from] Elapsed),
}
