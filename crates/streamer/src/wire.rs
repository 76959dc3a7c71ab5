//! Wire format codec
//!
//! One message per frame, all little-endian:
//!
//! ```text
//! Timestamp(8B u64) + TextLen(4B u32) + Text(UTF-8) + Transform(16 x 4B f32)
//! ```
//!
//! The timestamp is in absolute ticks (100 ns since 1601-01-01 UTC). The
//! transform is written m11, m12, .. m44 in row-major order. There is no
//! outer framing, checksum or terminator.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use contracts::Matrix4x4;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::StreamerError;

/// Longest diagnostic text accepted on the wire (bytes)
pub const MAX_TEXT_LEN: usize = 4096;

/// Timestamp + text length prefix
pub const HEADER_LEN: usize = 8 + 4;

/// 16 single-precision floats
pub const TRANSFORM_LEN: usize = 16 * 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WireError {
    #[error("text too long: {len} bytes (max {max})")]
    TextTooLong { len: usize, max: usize },

    #[error("text is not valid UTF-8: {0}")]
    InvalidText(#[from] std::str::Utf8Error),

    #[error("stream ended inside a message ({buffered} bytes buffered)")]
    Truncated { buffered: usize },
}

/// Decoded wire message
#[derive(Debug, Clone, PartialEq)]
pub struct WireMessage {
    /// Absolute ticks
    pub timestamp: u64,
    pub text: String,
    pub transform: Matrix4x4,
}

impl WireMessage {
    pub fn encode(&self) -> Result<Bytes, WireError> {
        encode_frame(self.timestamp, &self.text, &self.transform)
    }

    /// Size of the encoded message
    pub fn encoded_len(&self) -> usize {
        encoded_len(self.text.len())
    }
}

fn encoded_len(text_len: usize) -> usize {
    HEADER_LEN + text_len + TRANSFORM_LEN
}

/// Encode one message
pub fn encode_frame(timestamp: u64, text: &str, transform: &Matrix4x4) -> Result<Bytes, WireError> {
    let text = text.as_bytes();
    if text.len() > MAX_TEXT_LEN {
        return Err(WireError::TextTooLong {
            len: text.len(),
            max: MAX_TEXT_LEN,
        });
    }

    let mut buf = BytesMut::with_capacity(encoded_len(text.len()));
    buf.put_u64_le(timestamp);
    buf.put_u32_le(text.len() as u32);
    buf.put_slice(text);
    for value in transform.to_row_major() {
        buf.put_f32_le(value);
    }

    Ok(buf.freeze())
}

/// Decode one message from the front of `buf`
///
/// Returns `Ok(None)` and leaves `buf` untouched until a complete message is
/// buffered. A message with invalid text is consumed before the error is
/// returned, so the stream stays aligned. An oversized text length leaves no
/// trustworthy message boundary, so everything buffered is discarded.
pub fn decode_frame(buf: &mut BytesMut) -> Result<Option<WireMessage>, WireError> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }

    let mut header = &buf[..HEADER_LEN];
    let timestamp = header.get_u64_le();
    let text_len = header.get_u32_le() as usize;
    if text_len > MAX_TEXT_LEN {
        buf.clear();
        return Err(WireError::TextTooLong {
            len: text_len,
            max: MAX_TEXT_LEN,
        });
    }

    let total = encoded_len(text_len);
    if buf.len() < total {
        buf.reserve(total - buf.len());
        return Ok(None);
    }

    let mut frame = buf.split_to(total);
    frame.advance(HEADER_LEN);
    let text = std::str::from_utf8(&frame[..text_len])?.to_owned();
    frame.advance(text_len);
    let values: [f32; 16] = std::array::from_fn(|_| frame.get_f32_le());

    Ok(Some(WireMessage {
        timestamp,
        text,
        transform: Matrix4x4::from_row_major(values),
    }))
}

/// Incremental decoder for a receiving client
#[derive(Debug, Default)]
pub struct WireDecoder {
    buf: BytesMut,
}

impl WireDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn extend_from_slice(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Next complete message, if one is buffered
    pub fn decode_next(&mut self) -> Result<Option<WireMessage>, WireError> {
        decode_frame(&mut self.buf)
    }

    /// Bytes waiting for the rest of their message
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    /// Read from `reader` until a full message is decoded
    ///
    /// Returns `Ok(None)` on a clean end of stream.
    pub async fn read_message<R>(&mut self, reader: &mut R) -> Result<Option<WireMessage>, StreamerError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Some(message) = self.decode_next()? {
                return Ok(Some(message));
            }

            if reader.read_buf(&mut self.buf).await? == 0 {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(WireError::Truncated {
                    buffered: self.buf.len(),
                }
                .into());
            }
        }
    }
}
