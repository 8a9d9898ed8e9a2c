use crate::{
    error::RconError,
    packet::{Packet, PacketType},
    transport::{TcpTransport, Transport},
};
use log::{debug, trace, warn};
use tokio::sync::Mutex;

/// Where a [Client] is in its lifecycle. Only [Client::close] (or a failed
/// exchange) moves a session backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Unconnected,
    Connected,
    Authenticated,
}

/// Asynchronous rcon client. Drive it with `connect()`, `authenticate()`,
/// then any number of `execute_command()` calls, and `close()` when done.
///
/// Exactly one request is outstanding at a time: every method takes the
/// session lock for the whole "write request, read one response" exchange,
/// so a `Client` can be shared behind an `Arc` and calls are serialized.
///
/// ## Example
/// ```no_run
/// use rconsole::client::Client;
/// use std::error::Error;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn Error>> {
///     let client = Client::tcp();
///     client.connect("127.0.0.1", 27015).await?;
///
///     if !client.authenticate("<put rcon password here>").await? {
///         return Err("bad password".into());
///     }
///
///     let response = client.execute_command("echo hi").await?;
///     assert_eq!(response, "hi\n");
///     client.close().await?;
///     Ok(())
/// }
/// ```
pub struct Client<T: Transport = TcpTransport> {
    request_id: i32,
    max_frame_size: Option<usize>,
    session: Mutex<Session<T>>,
}

struct Session<T> {
    state: State,
    transport: T,
    // set while a request is on the wire; still set on entry means the last
    // exchange was cancelled and the stream position is unknown
    in_flight: bool,
}

impl Client<TcpTransport> {
    /// Client over a plain TCP connection without timeouts.
    pub fn tcp() -> Self {
        Self::new(TcpTransport::new())
    }
}

impl<T: Transport> Client<T> {
    /// Id the server echoes back on success, and never one it sends on
    /// authentication failure.
    pub const DEFAULT_REQUEST_ID: i32 = 0;
    const AUTH_FAILED_ID: i32 = -1;

    /// Wrap a transport. The client owns it until dropped.
    pub fn new(transport: T) -> Self {
        Client {
            request_id: Self::DEFAULT_REQUEST_ID,
            max_frame_size: None,
            session: Mutex::new(Session {
                state: State::Unconnected,
                transport,
                in_flight: false,
            }),
        }
    }

    /// Use `id` as the correlation id of every request. `-1` is reserved for
    /// authentication failures.
    pub fn with_request_id(mut self, id: i32) -> Result<Self, RconError> {
        if id == Self::AUTH_FAILED_ID {
            return Err(RconError::InvalidArgument(
                "request id -1 is reserved for failed authentication",
            ));
        }
        self.request_id = id;
        Ok(self)
    }

    /// Refuse response frames whose size field exceeds `size` bytes, before
    /// reading their body. Source servers never send more than 4096. Without
    /// this, any size up to `i32::MAX` is read.
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = Some(size);
        self
    }

    pub async fn state(&self) -> State {
        self.session.lock().await.state
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state().await == State::Authenticated
    }

    /// Open the connection. Returns `Ok(false)` and changes nothing if the
    /// transport is already connected.
    pub async fn connect(&self, host: &str, port: u16) -> Result<bool, RconError> {
        let mut session = self.session.lock().await;
        session.discard_if_interrupted().await;

        if session.transport.is_connected() {
            trace!("already connected, ignoring connect to {}:{}", host, port);
            return Ok(false);
        }

        let connected = session.transport.connect(host, port).await?;
        if connected {
            session.transition(State::Connected);
        }
        Ok(connected)
    }

    /// Send the password and read one response. `Ok(false)` means the server
    /// rejected the password; the session stays connected and may retry.
    pub async fn authenticate(&self, password: &str) -> Result<bool, RconError> {
        if password.is_empty() {
            return Err(RconError::InvalidArgument("password must not be empty"));
        }
        let auth_packet = Packet::new(self.request_id, PacketType::Auth, password)?;

        let mut session = self.session.lock().await;
        if session.discard_if_interrupted().await {
            return Err(RconError::IllegalState(
                "previous request was interrupted, reconnect first",
            ));
        }
        match session.state {
            State::Connected => {}
            State::Unconnected => {
                return Err(RconError::IllegalState("must connect before authenticating"))
            }
            State::Authenticated => {
                return Err(RconError::IllegalState("session is already authenticated"))
            }
        }

        trace!("sending auth packet to server");
        let response = session.exchange(&auth_packet, self.max_frame_size).await?;
        trace!("receive auth response for packet id {}", response.id());

        if response.id() == Self::AUTH_FAILED_ID {
            debug!("server rejected rcon password");
            return Ok(false);
        }

        session.transition(State::Authenticated);
        Ok(true)
    }

    /// Run a command and return the body of the single response frame. The
    /// protocol has no success flag; the text is whatever the server printed.
    pub async fn execute_command(&self, command: &str) -> Result<String, RconError> {
        if command.is_empty() {
            return Err(RconError::InvalidArgument("command must not be empty"));
        }
        let command_packet = Packet::new(self.request_id, PacketType::Exec, command)?;

        let mut session = self.session.lock().await;
        if session.discard_if_interrupted().await {
            return Err(RconError::IllegalState(
                "previous request was interrupted, reconnect first",
            ));
        }
        if session.state != State::Authenticated {
            return Err(RconError::IllegalState(
                "must authenticate before executing commands",
            ));
        }

        trace!("sending command packet to server");
        let response = session.exchange(&command_packet, self.max_frame_size).await?;
        trace!("receive response for packet id {}", response.id());

        Ok(response.into_body())
    }

    /// Close the connection. Closing an unconnected session is a no-op.
    pub async fn close(&self) -> Result<(), RconError> {
        let mut session = self.session.lock().await;
        session.in_flight = false;
        // before awaiting, so a dropped close() cannot leave a stale state
        session.transition(State::Unconnected);

        if session.transport.is_connected() {
            session.transport.close().await
        } else {
            Ok(())
        }
    }
}

impl<T: Transport> Session<T> {
    fn transition(&mut self, to: State) {
        if self.state != to {
            debug!("rcon session {:?} -> {:?}", self.state, to);
            self.state = to;
        }
    }

    /// Write one request and read one framed response. Any failure leaves the
    /// stream at an unknown position, so the transport is closed before the
    /// error is returned.
    async fn exchange(
        &mut self,
        request: &Packet,
        max_frame_size: Option<usize>,
    ) -> Result<Packet, RconError> {
        self.in_flight = true;

        match self.round_trip(request, max_frame_size).await {
            Ok(response) => {
                self.in_flight = false;
                Ok(response)
            }
            Err(e) => {
                warn!("rcon exchange failed, closing connection: {}", e);
                self.teardown().await;
                Err(e)
            }
        }
    }

    async fn round_trip(
        &mut self,
        request: &Packet,
        max_frame_size: Option<usize>,
    ) -> Result<Packet, RconError> {
        self.transport.send(&request.pack()).await?;

        // the transport has no framing, so read the size prefix first and
        // then exactly the bytes it announces
        let mut frame = self.transport.receive_exactly(Packet::SIZE_FIELD_LEN).await?;
        let size = Packet::declared_size(&frame)?;
        if let Some(max) = max_frame_size.filter(|max| size > *max) {
            return Err(RconError::MalformedPacket(format!(
                "size field {} exceeds the maximum frame size of {}",
                size, max
            )));
        }
        frame.extend(self.transport.receive_exactly(size).await?);

        Packet::unpack(&frame)
    }

    /// Returns true if a cancelled exchange had to be cleaned up.
    async fn discard_if_interrupted(&mut self) -> bool {
        if !self.in_flight {
            return false;
        }
        warn!("previous rcon request never completed, closing connection");
        self.teardown().await;
        true
    }

    async fn teardown(&mut self) {
        self.in_flight = false;
        self.transition(State::Unconnected);
        if let Err(e) = self.transport.close().await {
            debug!("error closing transport: {}", e);
        }
    }
}
