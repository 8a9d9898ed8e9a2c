use crate::error::RconError;

/// Type tag carried by every packet. The numeric codes overlap between
/// directions (2 is both `Exec` and `AuthResponse`), so decoding needs to know
/// who sent the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    // SERVERDATA_AUTH
    Auth,
    // SERVERDATA_EXECCOMMAND
    Exec,
    // SERVERDATA_AUTH_RESPONSE
    AuthResponse,
    // SERVERDATA_RESPONSE_VALUE
    Response,
}

impl PacketType {
    pub fn code(&self) -> i32 {
        match self {
            PacketType::Auth => 3,
            PacketType::Exec => 2,
            PacketType::AuthResponse => 2,
            PacketType::Response => 0,
        }
    }

    pub fn to_le_bytes(&self) -> [u8; 4] {
        self.code().to_le_bytes()
    }

    /// Interpret a type code sent by a client.
    pub fn from_request_code(code: i32) -> Result<Self, RconError> {
        match code {
            3 => Ok(PacketType::Auth),
            2 => Ok(PacketType::Exec),
            _ => Err(RconError::UnknownPacketType(code)),
        }
    }
}

/// Server-sent type codes, which is what a client decodes.
impl TryFrom<i32> for PacketType {
    type Error = RconError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        match code {
            2 => Ok(PacketType::AuthResponse),
            0 => Ok(PacketType::Response),
            _ => Err(RconError::UnknownPacketType(code)),
        }
    }
}

/// A single rcon frame.
///
/// On the wire: `size | id | type | body | 0x00 | 0x00`, all integers signed
/// 32-bit little endian, where `size` counts every byte after itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    id: i32,
    packet_type: PacketType,
    body: String,
}

impl Packet {
    /// id + type + the two terminators.
    pub const BASE_PACKAGE_SIZE: i32 = 10;
    /// Length of the size prefix preceding every frame.
    pub const SIZE_FIELD_LEN: usize = 4;
    const HEADER_LEN: usize = 8;

    /// Build a packet. The body cannot contain NUL since NUL terminates it on
    /// the wire, and must fit the 32-bit size field.
    pub fn new(id: i32, packet_type: PacketType, body: impl Into<String>) -> Result<Self, RconError> {
        let body = body.into();
        if body.as_bytes().contains(&0) {
            return Err(RconError::InvalidArgument("packet body cannot contain a NUL byte"));
        }
        if body.len() > (i32::MAX - Self::BASE_PACKAGE_SIZE) as usize {
            return Err(RconError::InvalidArgument("packet body too large"));
        }

        Ok(Packet {
            id,
            packet_type,
            body,
        })
    }

    /// Decode a frame sent by a server, size prefix included.
    pub fn unpack(incoming: &[u8]) -> Result<Self, RconError> {
        Self::unpack_with(incoming, <PacketType as TryFrom<i32>>::try_from)
    }

    /// Decode a frame sent by a client, size prefix included.
    pub fn unpack_request(incoming: &[u8]) -> Result<Self, RconError> {
        Self::unpack_with(incoming, PacketType::from_request_code)
    }

    fn unpack_with(
        incoming: &[u8],
        packet_type: fn(i32) -> Result<PacketType, RconError>,
    ) -> Result<Self, RconError> {
        let size = read_i32(incoming, 0)?;
        let rest = &incoming[Self::SIZE_FIELD_LEN..];

        if rest.len() < Self::HEADER_LEN {
            return Err(RconError::MalformedPacket(format!(
                "need {} header bytes, got {}",
                Self::HEADER_LEN,
                rest.len()
            )));
        }
        if size < 0 || size as usize != rest.len() {
            return Err(RconError::MalformedPacket(format!(
                "size field says {} bytes but {} were supplied",
                size,
                rest.len()
            )));
        }

        let id = read_i32(rest, 0)?;
        let packet_type = packet_type(read_i32(rest, 4)?)?;

        // strict: exactly two NULs close the frame
        let payload = &rest[Self::HEADER_LEN..];
        let body = match payload.strip_suffix(&[0, 0]) {
            Some(body) if !body.contains(&0) => body,
            _ => {
                return Err(RconError::MalformedPacket(
                    "body is not followed by exactly two NUL terminators".to_owned(),
                ))
            }
        };
        let body = std::str::from_utf8(body)?;

        Ok(Packet {
            id,
            packet_type,
            body: body.to_owned(),
        })
    }

    /// Read the size field from the first bytes of a frame. This tells the
    /// reader how many more bytes belong to the frame.
    pub fn declared_size(prefix: &[u8]) -> Result<usize, RconError> {
        let size = read_i32(prefix, 0)?;
        if size < Self::BASE_PACKAGE_SIZE {
            return Err(RconError::MalformedPacket(format!(
                "size field {} is smaller than the minimum of {}",
                size,
                Self::BASE_PACKAGE_SIZE
            )));
        }
        Ok(size as usize)
    }

    // Since the only one of these values that can change in length is the body,
    // an easy way to calculate the size of a packet is to find the byte-length
    // of the packet body, then add 10 to it.
    pub fn size(&self) -> i32 {
        self.body.len() as i32 + Self::BASE_PACKAGE_SIZE
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn packet_type(&self) -> &PacketType {
        &self.packet_type
    }

    pub fn body(&self) -> &str {
        self.body.as_ref()
    }

    pub fn into_body(self) -> String {
        self.body
    }

    pub fn pack(&self) -> Vec<u8> {
        // Size, ID, Type, Body, Terminator
        let mut payload = Vec::<u8>::with_capacity(Self::SIZE_FIELD_LEN + self.size() as usize);
        payload.extend_from_slice(&self.size().to_le_bytes());
        payload.extend_from_slice(&self.id().to_le_bytes());
        payload.extend_from_slice(&self.packet_type().to_le_bytes());
        payload.extend_from_slice(self.body().as_bytes());
        // null terminate the body, then null terminate the entire package
        payload.extend_from_slice(&[0, 0]);
        payload
    }
}

fn read_i32(bytes: &[u8], offset: usize) -> Result<i32, RconError> {
    bytes
        .get(offset..offset + 4)
        .and_then(|slice| slice.try_into().ok())
        .map(i32::from_le_bytes)
        .ok_or_else(|| {
            RconError::MalformedPacket(format!(
                "need 4 bytes at offset {}, got {}",
                offset,
                bytes.len().saturating_sub(offset)
            ))
        })
}
