#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! The binary request/response wire codec (§6 of the specification this
//! crate implements): 8-byte fixed headers framing a body whose internal
//! integers are little-endian, the same convention [`core::item::StringArray`]
//! uses for the trie's leaf values.
//!
//! # Design
//!
//! Header fields (`bodylen`, `status`) are network byte order (big-endian),
//! matching the reference implementation's use of `htons`/`htonl` on the
//! frame itself; everything inside the body is little-endian, matching the
//! reference implementation's host-byte-order convention on the machines it
//! ran on (Open Question O-4 resolves this ambiguity). Callers read and
//! write headers against any `tokio::io::{AsyncRead, AsyncWrite}`, so the
//! same codec serves a real `TcpStream` in the daemon and an in-memory
//! duplex pipe in tests.

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Request magic byte (`REQ`).
pub const REQUEST_MAGIC: u8 = 0x80;
/// Response magic byte (`RES`).
pub const RESPONSE_MAGIC: u8 = 0x81;

const HEADER_LEN: usize = 8;

/// The single defined request opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// A prefix-match query.
    Get = 0x00,
}

impl TryFrom<u8> for Opcode {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(Self::Get),
            other => Err(ProtocolError::UnknownOpcode { opcode: other }),
        }
    }
}

/// Response status code, carried network-byte-order in the response header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum Status {
    /// The request was served successfully (possibly with zero hits).
    Ok = 0x0000,
    /// The server could not allocate resources to serve the request.
    NoMemory = 0x0082,
}

/// A parsed 8-byte request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    /// The request opcode.
    pub opcode: Opcode,
    /// Length of the body that follows, in bytes.
    pub bodylen: u32,
}

/// Reads and validates an 8-byte request header.
///
/// # Errors
///
/// Returns [`ProtocolError::BadMagic`] if the magic byte does not match
/// [`REQUEST_MAGIC`], [`ProtocolError::UnknownOpcode`] for any opcode other
/// than [`Opcode::Get`], and [`ProtocolError::Io`] on a read failure
/// (including a clean EOF before a full header arrives).
pub async fn read_request_header<R: AsyncRead + Unpin>(reader: &mut R) -> Result<RequestHeader, ProtocolError> {
    let mut buf = [0u8; HEADER_LEN];
    reader.read_exact(&mut buf).await?;
    if buf[0] != REQUEST_MAGIC {
        return Err(ProtocolError::BadMagic { found: buf[0] });
    }
    let opcode = Opcode::try_from(buf[1])?;
    let bodylen = u32::from_be_bytes(buf[2..6].try_into().unwrap());
    Ok(RequestHeader { opcode, bodylen })
}

/// Writes an 8-byte response header.
///
/// # Errors
///
/// Returns [`ProtocolError::Io`] on a write failure.
pub async fn write_response_header<W: AsyncWrite + Unpin>(writer: &mut W, status: Status, bodylen: u32) -> Result<(), ProtocolError> {
    let mut buf = [0u8; HEADER_LEN];
    buf[0] = RESPONSE_MAGIC;
    buf[1..3].copy_from_slice(&(status as u16).to_be_bytes());
    buf[3..7].copy_from_slice(&bodylen.to_be_bytes());
    writer.write_all(&buf).await?;
    Ok(())
}

/// A parsed GET request body: `u32 max_number` (little-endian) followed by
/// the UTF-8 query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetRequest {
    /// Caller-requested result cap; `0` means "use the server default".
    pub max_number: u32,
    /// The raw query text.
    pub query: String,
}

impl GetRequest {
    /// Decodes a GET body already read into memory (the caller is
    /// responsible for reading exactly `bodylen` bytes first, per §4.7's
    /// `nread` state).
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] if `body` is shorter than the
    /// `u32` prefix, or [`ProtocolError::InvalidUtf8`] if the remaining
    /// bytes are not valid UTF-8.
    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        if body.len() < 4 {
            return Err(ProtocolError::Truncated);
        }
        let max_number = u32::from_le_bytes(body[0..4].try_into().unwrap());
        let query = std::str::from_utf8(&body[4..]).map_err(|_| ProtocolError::InvalidUtf8)?.to_owned();
        Ok(Self { max_number, query })
    }

    /// Encodes this request body (used by test clients and the HTTP admin
    /// bridge, which translates query-string parameters into this form).
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + self.query.len());
        buf.extend_from_slice(&self.max_number.to_le_bytes());
        buf.extend_from_slice(self.query.as_bytes());
        buf
    }
}

/// A successful query response body: `u32 count` (little-endian) followed
/// by `count` length-prefixed UTF-8 names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResponse {
    /// The matched names, already ranked and truncated.
    pub names: Vec<String>,
}

impl QueryResponse {
    /// Encodes the response body.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let count = u32::try_from(self.names.len()).expect("response name count exceeds u32::MAX");
        let mut buf = Vec::new();
        buf.extend_from_slice(&count.to_le_bytes());
        for name in &self.names {
            let bytes = name.as_bytes();
            let len = u32::try_from(bytes.len()).expect("name longer than u32::MAX bytes");
            buf.extend_from_slice(&len.to_le_bytes());
            buf.extend_from_slice(bytes);
        }
        buf
    }

    /// Decodes a response body already read into memory.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Truncated`] if `body` ends before a
    /// declared name's bytes, or [`ProtocolError::InvalidUtf8`] if a name
    /// is not valid UTF-8.
    pub fn decode(body: &[u8]) -> Result<Self, ProtocolError> {
        if body.len() < 4 {
            return Err(ProtocolError::Truncated);
        }
        let count = u32::from_le_bytes(body[0..4].try_into().unwrap());
        let mut cursor = 4usize;
        let mut names = Vec::with_capacity(count as usize);
        for _ in 0..count {
            if cursor + 4 > body.len() {
                return Err(ProtocolError::Truncated);
            }
            let len = u32::from_le_bytes(body[cursor..cursor + 4].try_into().unwrap()) as usize;
            cursor += 4;
            let end = cursor.checked_add(len).filter(|&e| e <= body.len()).ok_or(ProtocolError::Truncated)?;
            let name = std::str::from_utf8(&body[cursor..end]).map_err(|_| ProtocolError::InvalidUtf8)?.to_owned();
            names.push(name);
            cursor = end;
        }
        Ok(Self { names })
    }

    /// Writes header and body for a successful response in one call.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Io`] on a write failure.
    pub async fn write<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> Result<(), ProtocolError> {
        let body = self.encode();
        let bodylen = u32::try_from(body.len()).expect("response body exceeds u32::MAX bytes");
        write_response_header(writer, Status::Ok, bodylen).await?;
        writer.write_all(&body).await?;
        Ok(())
    }
}

/// Protocol-level failures (§7's `ProtocolError` category): these close the
/// connection rather than produce a reply.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The header's magic byte did not match [`REQUEST_MAGIC`].
    #[error("bad request magic byte {found:#x}")]
    BadMagic {
        /// The byte actually read.
        found: u8,
    },
    /// The header named an opcode this server does not implement.
    #[error("unknown opcode {opcode:#x}")]
    UnknownOpcode {
        /// The byte actually read.
        opcode: u8,
    },
    /// A body ended before its declared length-prefixed fields.
    #[error("truncated body")]
    Truncated,
    /// A body contained a name that was not valid UTF-8.
    #[error("body contained invalid UTF-8")]
    InvalidUtf8,
    /// Reading or writing the underlying stream failed.
    #[error("protocol I/O error")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    #[tokio::test]
    async fn request_header_round_trips() {
        let (mut client, mut server) = duplex(64);
        let header = [REQUEST_MAGIC, 0x00, 0, 0, 0, 5, 0, 0];
        client.write_all(&header).await.unwrap();
        let parsed = read_request_header(&mut server).await.unwrap();
        assert_eq!(parsed.opcode, Opcode::Get);
        assert_eq!(parsed.bodylen, 5);
    }

    #[tokio::test]
    async fn bad_magic_is_rejected() {
        let (mut client, mut server) = duplex(64);
        let header = [0x00, 0x00, 0, 0, 0, 0, 0, 0];
        client.write_all(&header).await.unwrap();
        let err = read_request_header(&mut server).await.unwrap_err();
        assert!(matches!(err, ProtocolError::BadMagic { found: 0x00 }));
    }

    #[tokio::test]
    async fn unknown_opcode_is_rejected() {
        let (mut client, mut server) = duplex(64);
        let header = [REQUEST_MAGIC, 0x7f, 0, 0, 0, 0, 0, 0];
        client.write_all(&header).await.unwrap();
        let err = read_request_header(&mut server).await.unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownOpcode { opcode: 0x7f }));
    }

    #[test]
    fn get_request_round_trips() {
        let request = GetRequest { max_number: 10, query: "beij".to_owned() };
        let encoded = request.encode();
        let decoded = GetRequest::decode(&encoded).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn query_response_round_trips() {
        let response = QueryResponse { names: vec!["北京".to_owned(), "北京西站".to_owned()] };
        let encoded = response.encode();
        let decoded = QueryResponse::decode(&encoded).unwrap();
        assert_eq!(decoded, response);
    }

    #[tokio::test]
    async fn response_header_round_trips() {
        let (mut client, mut server) = duplex(64);
        write_response_header(&mut client, Status::NoMemory, 42).await.unwrap();
        let mut buf = [0u8; HEADER_LEN];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf[0], RESPONSE_MAGIC);
        assert_eq!(u16::from_be_bytes([buf[1], buf[2]]), Status::NoMemory as u16);
        assert_eq!(u32::from_be_bytes([buf[3], buf[4], buf[5], buf[6]]), 42);
    }
}
