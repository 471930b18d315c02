//! Line framing for the IRC byte stream.
//!
//! [`LineCodec`] implements the tokio codec traits over raw bytes: inbound
//! chunks are split on CR, LF or CRLF (an unterminated tail stays buffered
//! until more bytes arrive), empty lines are dropped, and outbound lines are
//! terminated with CRLF. Decoding goes through a [`Transcoder`] so that
//! non-UTF-8 servers can be handled by an external transcoding layer.

use std::sync::Arc;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ClientError;

/// Longest inbound line accepted without a terminator.
pub const MAX_LINE_LEN: usize = 8191;

/// Converts raw inbound bytes into text.
///
/// Character-set detection and transcoding live outside this crate; the
/// default implementation decodes as UTF-8, replacing invalid sequences.
pub trait Transcoder: Send + Sync {
    /// Decode one line worth of bytes into text.
    fn decode(&self, bytes: &[u8]) -> String;
}

/// Lossy UTF-8 [`Transcoder`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Utf8Lossy;

impl Transcoder for Utf8Lossy {
    fn decode(&self, bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// CR/LF/CRLF line codec with partial-tail retention.
#[derive(Clone)]
pub struct LineCodec {
    transcoder: Arc<dyn Transcoder>,
}

impl LineCodec {
    /// Codec with the default UTF-8 transcoder.
    pub fn new() -> Self {
        Self::with_transcoder(Arc::new(Utf8Lossy))
    }

    /// Codec decoding through the given transcoder.
    pub fn with_transcoder(transcoder: Arc<dyn Transcoder>) -> Self {
        Self { transcoder }
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ClientError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ClientError> {
        loop {
            let Some(pos) = src.iter().position(|&b| b == b'\r' || b == b'\n') else {
                if src.len() > MAX_LINE_LEN {
                    return Err(ClientError::LineTooLong(src.len()));
                }
                return Ok(None);
            };

            let line = src.split_to(pos);
            src.advance(1);
            if line.is_empty() {
                // A CRLF pair leaves an empty segment after the CR cut;
                // bare empty lines are dropped the same way.
                continue;
            }
            return Ok(Some(self.transcoder.decode(&line)));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, ClientError> {
        match self.decode(src)? {
            Some(line) => Ok(Some(line)),
            None => {
                // Connection closed mid-line: the unterminated tail is
                // discarded.
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ClientError;

    fn encode(&mut self, line: String, dst: &mut BytesMut) -> Result<(), ClientError> {
        dst.reserve(line.len() + 2);
        dst.put_slice(line.as_bytes());
        dst.put_slice(b"\r\n");
        Ok(())
    }
}
