//! Frame codec properties: SLIP transparency, checksum coverage and
//! stream reassembly.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use klf200_bridge::datagram::{
    ActivateProductgroupReq, Command, CommandSendReq, Datagram, DatagramType, GetSceneListNtf,
    SessionRequest,
};
use klf200_bridge::error::{Error, FrameError};
use klf200_bridge::protocol::{
    decode_frame, encode_frame, slip_escape, slip_unescape, FrameCodec, END,
};
use klf200_bridge::types::SessionId;

/// A send-command request whose payload contains END and ESC bytes.
fn awkward_request() -> Datagram {
    let mut req = CommandSendReq::empty();
    req.set_session_id(SessionId(0xC0DB)).unwrap();
    req.set_main_parameter(0xC800).unwrap();
    req.set_functional_parameter(1, 0xDBC0).unwrap();
    req.set_nodes(&[0, 199, 255]).unwrap();
    req.into()
}

// ============================================================================
// SLIP
// ============================================================================

#[test]
fn test_slip_is_transparent() {
    let inputs: [&[u8]; 5] = [
        &[],
        &[0x00, 0x00, 0x00],
        &[0xC0, 0xDB, 0xC0, 0xDB],
        &[0xDB, 0xDC, 0xDB, 0xDD],
        &[0xFF; 32],
    ];

    for input in inputs {
        let escaped = slip_escape(input);
        assert!(!escaped.contains(&END), "END leaked for {input:02X?}");
        assert_eq!(slip_unescape(&escaped).unwrap(), input);
    }
}

#[test]
fn test_escaped_frame_decodes() {
    let datagram = awkward_request();
    let encoded = encode_frame(&datagram).unwrap();

    assert_eq!(encoded.first(), Some(&END));
    assert_eq!(encoded.last(), Some(&END));
    assert_eq!(encoded.iter().filter(|&&b| b == END).count(), 2);
    assert_eq!(decode_frame(&encoded).unwrap(), datagram);
}

// ============================================================================
// Checksum
// ============================================================================

#[test]
fn test_any_single_bit_flip_is_detected() {
    let encoded = encode_frame(&awkward_request()).unwrap();
    let frame = slip_unescape(&encoded[1..encoded.len() - 1]).unwrap();

    for index in 0..frame.len() {
        for bit in 0..8 {
            let mut corrupted = frame.clone();
            corrupted[index] ^= 1 << bit;

            let mut wire = vec![END];
            wire.extend(slip_escape(&corrupted));
            wire.push(END);

            match decode_frame(&wire) {
                Err(Error::Frame(FrameError::ChecksumMismatch { .. })) => {}
                other => panic!("flip at byte {index} bit {bit} not detected: {other:?}"),
            }
        }
    }
}

// ============================================================================
// Boundaries
// ============================================================================

#[test]
fn test_boundary_values_survive_encoding() {
    for (id, target) in [(0u8, 0x0000u16), (199, 0xC800), (255, 0xF7FF)] {
        let mut req = ActivateProductgroupReq::empty();
        req.set_group_id(id).unwrap();
        req.set_value(target).unwrap();

        let decoded = decode_frame(&encode_frame(&req.clone().into()).unwrap()).unwrap();
        match decoded {
            Datagram::ActivateProductgroupReq(decoded) => {
                assert_eq!(decoded.group_id().unwrap(), id);
                assert_eq!(decoded.value().unwrap(), target);
                assert_eq!(decoded, req);
            }
            other => panic!("unexpected datagram {other:?}"),
        }
    }
}

#[test]
fn test_largest_payload_round_trips() {
    let mut ntf = GetSceneListNtf::empty();
    for (id, name) in [(0, "Morning"), (1, "Evening"), (2, "Night")] {
        ntf.push_scene(id, name).unwrap();
    }
    ntf.set_remaining(7).unwrap();

    let datagram: Datagram = ntf.into();
    let decoded = decode_frame(&encode_frame(&datagram).unwrap()).unwrap();
    assert_eq!(decoded, datagram);
    assert_eq!(decoded.command(), Command::GetSceneListNtf);
}

// ============================================================================
// Stream codec
// ============================================================================

#[test]
fn test_codec_reassembles_split_frames() {
    let mut codec = FrameCodec::new();
    let mut wire = BytesMut::new();
    codec.encode(awkward_request(), &mut wire).unwrap();
    codec.encode(awkward_request(), &mut wire).unwrap();

    let mut buf = BytesMut::new();
    let mut decoded = Vec::new();
    for byte in wire {
        buf.extend_from_slice(&[byte]);
        while let Some(item) = codec.decode(&mut buf).unwrap() {
            decoded.push(item.unwrap());
        }
    }

    assert_eq!(decoded, vec![awkward_request(), awkward_request()]);
}

#[test]
fn test_codec_survives_corrupt_frame() {
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::new();

    let mut corrupt = encode_frame(&awkward_request()).unwrap();
    // Protocol byte, never a SLIP special
    corrupt[1] ^= 0x01;
    buf.extend_from_slice(&corrupt);
    codec.encode(awkward_request(), &mut buf).unwrap();

    let first = codec.decode(&mut buf).unwrap().unwrap();
    assert!(first.is_err());
    let second = codec.decode(&mut buf).unwrap().unwrap();
    assert_eq!(second.unwrap(), awkward_request());
    assert!(codec.decode(&mut buf).unwrap().is_none());
}
