//! Stream framing for SLIP-delimited frames.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use super::{decode_frame, encode_frame, END, MAX_ENCODED_SIZE};
use crate::datagram::Datagram;
use crate::error::{FrameError, Result};

/// Tokio codec splitting a byte stream into datagrams.
///
/// Each decoded item is itself a `Result`: a malformed frame is reported
/// and skipped while the stream keeps going. Only I/O failures end the
/// stream.
pub struct FrameCodec {
    max_frame_size: usize,
}

impl FrameCodec {
    /// Create a new codec with default settings.
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_ENCODED_SIZE,
        }
    }

    /// Create a codec with a custom limit for undelimited input.
    pub fn with_max_frame(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Result<Datagram>;
    type Error = crate::Error;

    fn decode(
        &mut self,
        src: &mut BytesMut,
    ) -> std::result::Result<Option<Self::Item>, Self::Error> {
        loop {
            // Skip anything before the opening delimiter
            let Some(start) = src.iter().position(|b| *b == END) else {
                src.clear();
                return Ok(None);
            };
            src.advance(start);

            match src[1..].iter().position(|b| *b == END) {
                // END END: the second END opens the next frame
                Some(0) => src.advance(1),
                Some(offset) => {
                    let frame = src.split_to(offset + 2);
                    trace!(frame = %hex::encode(&frame), "received frame");
                    return Ok(Some(decode_frame(&frame)));
                }
                None if src.len() > self.max_frame_size => {
                    src.clear();
                    return Ok(Some(Err(FrameError::Oversized {
                        max: self.max_frame_size,
                    }
                    .into())));
                }
                None => return Ok(None),
            }
        }
    }

    fn decode_eof(
        &mut self,
        src: &mut BytesMut,
    ) -> std::result::Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => {
                // Incomplete trailing frame
                src.clear();
                Ok(None)
            }
        }
    }
}

impl Encoder<Datagram> for FrameCodec {
    type Error = crate::Error;

    fn encode(&mut self, item: Datagram, dst: &mut BytesMut) -> std::result::Result<(), Self::Error> {
        let encoded = encode_frame(&item)?;
        trace!(command = %item.command(), frame = %hex::encode(&encoded), "sending frame");
        dst.reserve(encoded.len());
        dst.put_slice(&encoded);

        Ok(())
    }
}
