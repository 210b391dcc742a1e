//! Wire protocol of the KLF-200.
//!
//! Every datagram travels as one SLIP-wrapped frame.
//!
//! ## Frame Format
//!
//! ```text
//! ┌──────────────┬────────────┬──────────────────┬─────────────┬──────────────┐
//! │ Protocol (1) │ Length (1) │ Command (2, BE)  │ Payload ... │ Checksum (1) │
//! └──────────────┴────────────┴──────────────────┴─────────────┴──────────────┘
//! ```
//!
//! - protocol is always `0`
//! - length is `3 + payload length`
//! - checksum is the XOR of every preceding byte
//!
//! The frame is then enclosed in SLIP END bytes (`0xC0`) with END and ESC
//! bytes inside escaped as `0xDB 0xDC` and `0xDB 0xDD`.

mod codec;
mod frame;

pub use codec::FrameCodec;
pub use frame::{
    build_frame, checksum, decode_frame, encode_frame, slip_escape, slip_unescape,
};

/// SLIP frame delimiter.
pub const END: u8 = 0xC0;

/// SLIP escape byte.
pub const ESC: u8 = 0xDB;

/// Escaped form of END (after ESC).
pub const ESC_END: u8 = 0xDC;

/// Escaped form of ESC (after ESC).
pub const ESC_ESC: u8 = 0xDD;

/// Protocol id carried in the first frame byte.
pub const PROTOCOL_ID: u8 = 0;

/// Frame overhead: protocol, length, command (2) and checksum.
pub const FRAME_OVERHEAD: usize = 5;

/// Minimum unescaped frame size.
pub const MIN_FRAME_SIZE: usize = FRAME_OVERHEAD;

/// Largest payload the length byte can describe.
pub const MAX_PAYLOAD_SIZE: usize = u8::MAX as usize - 3;

/// Largest unescaped frame.
pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD_SIZE + FRAME_OVERHEAD;

/// Largest SLIP-wrapped frame: every byte escaped plus two delimiters.
pub const MAX_ENCODED_SIZE: usize = MAX_FRAME_SIZE * 2 + 2;
