//! Frame building, SLIP escaping and frame decoding.

use super::{END, ESC, ESC_END, ESC_ESC, MAX_PAYLOAD_SIZE, MIN_FRAME_SIZE, PROTOCOL_ID};
use crate::datagram::{lookup, Command, Datagram, Payload, WireEnum};
use crate::error::{Error, FrameError, Result};

/// XOR of all bytes, salt 0.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0, |acc, b| acc ^ b)
}

/// Escape END and ESC bytes. Does not add delimiters.
pub fn slip_escape(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 8);
    for &byte in data {
        match byte {
            END => out.extend_from_slice(&[ESC, ESC_END]),
            ESC => out.extend_from_slice(&[ESC, ESC_ESC]),
            other => out.push(other),
        }
    }
    out
}

/// Reverse [`slip_escape`]. An unescaped END inside `data` is an error.
pub fn slip_unescape(data: &[u8]) -> std::result::Result<Vec<u8>, FrameError> {
    let mut out = Vec::with_capacity(data.len());
    let mut bytes = data.iter().enumerate();
    while let Some((offset, &byte)) = bytes.next() {
        match byte {
            END => return Err(FrameError::UnexpectedEnd(offset)),
            ESC => match bytes.next() {
                Some((_, &ESC_END)) => out.push(END),
                Some((_, &ESC_ESC)) => out.push(ESC),
                Some((_, &other)) => return Err(FrameError::InvalidEscape(other)),
                None => return Err(FrameError::Truncated(out.len())),
            },
            other => out.push(other),
        }
    }
    Ok(out)
}

/// Build the SLIP-wrapped frame for a raw command id and payload.
pub fn build_frame(command: u16, payload: &[u8]) -> std::result::Result<Vec<u8>, FrameError> {
    if payload.len() > MAX_PAYLOAD_SIZE {
        return Err(FrameError::Oversized {
            max: MAX_PAYLOAD_SIZE,
        });
    }

    let mut frame = Vec::with_capacity(payload.len() + MIN_FRAME_SIZE);
    frame.push(PROTOCOL_ID);
    frame.push((payload.len() + 3) as u8);
    frame.extend_from_slice(&command.to_be_bytes());
    frame.extend_from_slice(payload);
    frame.push(checksum(&frame));

    let mut out = Vec::with_capacity(frame.len() * 2 + 2);
    out.push(END);
    out.extend(slip_escape(&frame));
    out.push(END);
    Ok(out)
}

/// Encode a datagram into its SLIP-wrapped frame.
pub fn encode_frame(datagram: &Datagram) -> Result<Vec<u8>> {
    let command = datagram.command().raw() as u16;
    Ok(build_frame(command, datagram.payload().as_bytes())?)
}

/// Decode one SLIP-wrapped frame into a datagram.
///
/// Frame errors affect only this frame. Commands without a catalog entry
/// yield [`Error::UnknownCommand`].
pub fn decode_frame(data: &[u8]) -> Result<Datagram> {
    if data.len() < 3 || data[0] != END || data[data.len() - 1] != END {
        return Err(FrameError::Envelope.into());
    }

    let frame = slip_unescape(&data[1..data.len() - 1]).map_err(|e| match e {
        FrameError::UnexpectedEnd(offset) => FrameError::UnexpectedEnd(offset + 1),
        other => other,
    })?;

    if frame.len() < MIN_FRAME_SIZE {
        return Err(FrameError::Truncated(frame.len()).into());
    }

    let (body, trailer) = frame.split_at(frame.len() - 1);
    let expected = checksum(body);
    if expected != trailer[0] {
        return Err(FrameError::ChecksumMismatch {
            expected,
            actual: trailer[0],
        }
        .into());
    }

    if body[0] != PROTOCOL_ID {
        return Err(FrameError::UnsupportedProtocol(body[0]).into());
    }

    if usize::from(body[1]) != frame.len() - 2 {
        return Err(FrameError::LengthMismatch {
            declared: body[1],
            actual: frame.len(),
        }
        .into());
    }

    let raw = u16::from_be_bytes([body[2], body[3]]);
    let command = Command::from_raw(u64::from(raw)).ok_or(Error::UnknownCommand(raw))?;
    let entry = lookup(command).ok_or(Error::UnknownCommand(raw))?;

    let payload = &body[4..];
    if payload.len() > entry.size {
        return Err(FrameError::PayloadTooLarge {
            command,
            size: payload.len(),
            max: entry.size,
        }
        .into());
    }

    let payload = Payload::from_bytes(entry.size, payload)?;
    Ok((entry.build)(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datagram::{
        CommandSendReq, DatagramType, GetSceneListNtf, GetStateReq, PasswordEnterReq,
    };
    use crate::types::SessionId;

    #[test]
    fn test_empty_request_layout() {
        let frame = encode_frame(&GetStateReq::empty().into()).unwrap();
        // 00 03 00 0C checksum 0x0F
        assert_eq!(frame, vec![END, 0x00, 0x03, 0x00, 0x0C, 0x0F, END]);
    }

    #[test]
    fn test_escape_special_bytes() {
        let data = [0x00, END, 0x01, ESC, 0xFF];
        let escaped = slip_escape(&data);
        assert_eq!(escaped, vec![0x00, ESC, ESC_END, 0x01, ESC, ESC_ESC, 0xFF]);
        assert!(!escaped.contains(&END));
        assert_eq!(slip_unescape(&escaped).unwrap(), data);
    }

    #[test]
    fn test_unescape_rejects_bad_sequences() {
        assert_eq!(slip_unescape(&[ESC, 0x01]), Err(FrameError::InvalidEscape(0x01)));
        assert_eq!(slip_unescape(&[0x01, ESC]), Err(FrameError::Truncated(1)));
        assert_eq!(slip_unescape(&[0x01, END]), Err(FrameError::UnexpectedEnd(1)));
    }

    #[test]
    fn test_round_trip_with_escaped_payload() {
        let mut req = PasswordEnterReq::new("\u{c0}ab").unwrap();
        req.payload_mut().write_u8(31, ESC).unwrap();
        let datagram: Datagram = req.into();

        let frame = encode_frame(&datagram).unwrap();
        assert_eq!(decode_frame(&frame).unwrap(), datagram);
    }

    #[test]
    fn test_round_trip_boundary_values() {
        for (node, target) in [(0u8, 0x0000u16), (199, 0xC800), (255, 0xF7FF)] {
            let mut req = CommandSendReq::empty();
            req.set_nodes(&[node]).unwrap();
            req.set_main_parameter(target).unwrap();
            let mut datagram: Datagram = req.into();
            datagram
                .as_session_request_mut()
                .unwrap()
                .set_session_id(SessionId(u16::MAX))
                .unwrap();

            let frame = encode_frame(&datagram).unwrap();
            assert_eq!(decode_frame(&frame).unwrap(), datagram);
        }
    }

    #[test]
    fn test_every_bit_flip_is_detected() {
        let mut ntf = GetSceneListNtf::empty();
        ntf.push_scene(1, "Morning").unwrap();
        let frame = encode_frame(&ntf.into()).unwrap();

        for index in 1..frame.len() - 1 {
            if frame[index] == ESC || frame[index - 1] == ESC {
                continue;
            }
            for bit in 0..8 {
                let mut corrupted = frame.clone();
                corrupted[index] ^= 1 << bit;
                if corrupted[index] == END || corrupted[index] == ESC {
                    continue;
                }
                assert!(
                    matches!(
                        decode_frame(&corrupted),
                        Err(Error::Frame(FrameError::ChecksumMismatch { .. }))
                    ),
                    "flip of bit {bit} at {index} not detected"
                );
            }
        }
    }

    #[test]
    fn test_envelope_errors() {
        assert!(matches!(
            decode_frame(&[0x00, 0x03, 0x00, 0x0C, 0x0F]),
            Err(Error::Frame(FrameError::Envelope))
        ));
        assert!(matches!(
            decode_frame(&[END, 0x00, END, 0x0C, 0x0F, END]),
            Err(Error::Frame(FrameError::UnexpectedEnd(2)))
        ));
        assert!(matches!(
            decode_frame(&[END, 0x00, 0x03, END]),
            Err(Error::Frame(FrameError::Truncated(2)))
        ));
    }

    #[test]
    fn test_protocol_and_length_checked() {
        let frame = build_frame(0x000C, &[]).unwrap();
        let mut bad_protocol = frame.clone();
        bad_protocol[1] = 0x01;
        bad_protocol[5] ^= 0x01;
        assert!(matches!(
            decode_frame(&bad_protocol),
            Err(Error::Frame(FrameError::UnsupportedProtocol(1)))
        ));

        let mut bad_length = frame;
        bad_length[2] = 0x04;
        bad_length[5] ^= 0x07;
        assert!(matches!(
            decode_frame(&bad_length),
            Err(Error::Frame(FrameError::LengthMismatch { declared: 4, .. }))
        ));
    }

    #[test]
    fn test_unknown_command() {
        let frame = build_frame(0x7777, &[1, 2]).unwrap();
        assert!(matches!(decode_frame(&frame), Err(Error::UnknownCommand(0x7777))));

        // Known to the enumeration, not modelled by the catalog
        let frame = build_frame(Command::CsDiscoverNodesReq.raw() as u16, &[0]).unwrap();
        assert!(matches!(decode_frame(&frame), Err(Error::UnknownCommand(0x0103))));
    }

    #[test]
    fn test_payload_size_against_catalog() {
        // GetStateReq carries no payload
        let frame = build_frame(0x000C, &[1]).unwrap();
        assert!(matches!(
            decode_frame(&frame),
            Err(Error::Frame(FrameError::PayloadTooLarge { size: 1, max: 0, .. }))
        ));

        // Short payload is zero-filled
        let frame = build_frame(Command::GetStateCfm.raw() as u16, &[2]).unwrap();
        let datagram = decode_frame(&frame).unwrap();
        assert_eq!(datagram.payload().as_bytes(), &[2, 0, 0, 0, 0, 0]);
    }
}
