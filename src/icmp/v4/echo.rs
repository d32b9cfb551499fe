//! Echo request encoding and echo reply decoding.
//!
//! Request layout (all multi-byte fields in network byte order):
//!
//! | offset | width | field                                   |
//! |--------|-------|-----------------------------------------|
//! | 0      | 1     | type (8)                                |
//! | 1      | 1     | code (0)                                |
//! | 2      | 2     | checksum                                |
//! | 4      | 2     | identifier                              |
//! | 6      | 2     | sequence number                         |
//! | 8      | 16    | send time, only when timing is enabled  |
//! | ...    | ...   | filler, byte at packet offset i = i & 0xff |
//!
//! The send time is seconds since the Unix epoch (8 bytes) followed by microseconds (8 bytes).

use super::checksum::internet_checksum;
use super::SequenceNumber;
use pnet_packet::icmp::echo_reply::EchoReplyPacket;
use pnet_packet::icmp::echo_request::MutableEchoRequestPacket;
use pnet_packet::icmp::{IcmpCode, IcmpTypes};
use pnet_packet::{MutablePacket, Packet};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const ICMP_HEADER_SIZE: usize = 8;
pub const TIMESTAMP_SIZE: usize = 16;
/// Capacity of the send and receive buffers.
pub const MAX_PACKET_SIZE: usize = 4096;

/// An accepted echo reply.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct EchoReply {
    pub icmp_type: u8,
    pub code: u8,
    pub identifier: u16,
    pub sequence_number: SequenceNumber,
}

/// Why an inbound datagram was not accepted as a reply to this session.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Rejection {
    TooShort { len: usize, needed: usize },
    WrongType { icmp_type: u8, code: u8 },
    /// A reply that belongs to another ping process on this host.
    ForeignIdentifier { identifier: u16 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooShort { len, needed } => write!(f, "packet too short ({len} bytes, need {needed})"),
            Rejection::WrongType { icmp_type, code } => write!(f, "icmp_type={icmp_type} code={code}"),
            Rejection::ForeignIdentifier { identifier } => write!(f, "foreign identifier {identifier}"),
        }
    }
}

/// Timing is only possible when the payload can hold a send timestamp.
pub(crate) fn timing_enabled(datalen: usize) -> bool {
    datalen >= TIMESTAMP_SIZE
}

/// Writes an echo request into `buf`, which must be exactly header plus payload long.
/// Returns the number of bytes encoded or `None` if `buf` cannot hold an ICMP header.
pub(crate) fn encode_echo_request(
    buf: &mut [u8],
    identifier: u16,
    sequence_number: SequenceNumber,
    send_time: Option<SystemTime>,
) -> Option<usize> {
    let mut package = MutableEchoRequestPacket::new(buf)?;
    package.set_icmp_type(IcmpTypes::EchoRequest);
    package.set_icmp_code(IcmpCode::new(0));
    package.set_checksum(0_u16);
    package.set_identifier(identifier);
    package.set_sequence_number(sequence_number.into());

    let payload = package.payload_mut();
    let fill_start = match send_time {
        Some(send_time) if payload.len() >= TIMESTAMP_SIZE => {
            write_timestamp(&mut payload[..TIMESTAMP_SIZE], send_time);
            TIMESTAMP_SIZE
        }
        _ => 0,
    };
    for (idx, byte) in payload.iter_mut().enumerate().skip(fill_start) {
        #[allow(clippy::cast_possible_truncation)]
        let pattern = ((ICMP_HEADER_SIZE + idx) & 0xff) as u8;
        *byte = pattern;
    }

    let checksum = internet_checksum(package.packet());
    package.set_checksum(checksum);
    Some(package.packet().len())
}

/// Decodes a raw-socket datagram (IP header included) and checks that it is an echo reply
/// carrying `identifier`.
pub(crate) fn decode_echo_reply(buf: &[u8], identifier: u16) -> Result<EchoReply, Rejection> {
    // IHL is the low nibble of the first byte, counted in 4-byte words.
    let ip_header_len = buf.first().map_or(0, |b| usize::from(b & 0x0f) * 4);
    let needed = ip_header_len + ICMP_HEADER_SIZE;
    if buf.len() < needed {
        return Err(Rejection::TooShort { len: buf.len(), needed });
    }

    let reply = EchoReplyPacket::new(&buf[ip_header_len..]).ok_or(Rejection::TooShort { len: buf.len(), needed })?;
    if reply.get_icmp_type() != IcmpTypes::EchoReply {
        return Err(Rejection::WrongType { icmp_type: reply.get_icmp_type().0, code: reply.get_icmp_code().0 });
    }
    if reply.get_identifier() != identifier {
        return Err(Rejection::ForeignIdentifier { identifier: reply.get_identifier() });
    }

    Ok(EchoReply {
        icmp_type: reply.get_icmp_type().0,
        code: reply.get_icmp_code().0,
        identifier: reply.get_identifier(),
        sequence_number: reply.get_sequence_number().into(),
    })
}

/// Reads the send time embedded in an encoded echo request.
pub(crate) fn read_timestamp(request: &[u8]) -> Option<SystemTime> {
    let stamp = request.get(ICMP_HEADER_SIZE..ICMP_HEADER_SIZE + TIMESTAMP_SIZE)?;
    let secs = u64::from_be_bytes(stamp[..8].try_into().ok()?);
    let micros = u64::from_be_bytes(stamp[8..].try_into().ok()?);
    UNIX_EPOCH.checked_add(Duration::from_secs(secs).checked_add(Duration::from_micros(micros))?)
}

/// Whole milliseconds between send and receive. A receive time before the send time (clock
/// stepped backwards) counts as zero.
pub(crate) fn round_trip_millis(sent: SystemTime, received: SystemTime) -> u64 {
    received
        .duration_since(sent)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
}

fn write_timestamp(buf: &mut [u8], time: SystemTime) {
    let since_epoch = time.duration_since(UNIX_EPOCH).unwrap_or_default();
    buf[..8].copy_from_slice(&since_epoch.as_secs().to_be_bytes());
    buf[8..16].copy_from_slice(&u64::from(since_epoch.subsec_micros()).to_be_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icmp::v4::socket::tests::echo_reply_datagram;

    const IDENT: u16 = 0x1234;

    fn request(datalen: usize, sequence_number: u16, send_time: Option<SystemTime>) -> Vec<u8> {
        let mut buf = vec![0u8; ICMP_HEADER_SIZE + datalen];
        let n = encode_echo_request(&mut buf, IDENT, sequence_number.into(), send_time).unwrap();
        assert_eq!(buf.len(), n);
        buf
    }

    #[test]
    fn encoded_request_has_expected_size_type_and_checksum() {
        let now = SystemTime::now();
        for datalen in [0, 1, 15, 16, 17, 56, 1000, MAX_PACKET_SIZE - ICMP_HEADER_SIZE] {
            let buf = request(datalen, 7, Some(now));
            assert_eq!(datalen + ICMP_HEADER_SIZE, buf.len());
            assert_eq!(8, buf[0]);
            assert_eq!(0, buf[1]);
            assert_eq!(0, internet_checksum(&buf), "checksum does not verify for datalen {datalen}");
        }
    }

    #[test]
    fn header_fields_are_network_byte_order() {
        let buf = request(0, 0x0102, None);
        assert_eq!([0x12, 0x34], buf[4..6]);
        assert_eq!([0x01, 0x02], buf[6..8]);
    }

    #[test]
    fn filler_starts_after_timestamp() {
        let buf = request(56, 0, Some(SystemTime::now()));
        for (idx, byte) in buf.iter().enumerate().skip(ICMP_HEADER_SIZE + TIMESTAMP_SIZE) {
            assert_eq!((idx & 0xff) as u8, *byte);
        }
    }

    #[test]
    fn filler_starts_at_payload_without_timing() {
        let buf = request(300, 0, None);
        for (idx, byte) in buf.iter().enumerate().skip(ICMP_HEADER_SIZE) {
            assert_eq!((idx & 0xff) as u8, *byte);
        }
    }

    #[test]
    fn short_payload_gets_no_timestamp() {
        let buf = request(15, 0, Some(SystemTime::now()));
        assert_eq!(None, read_timestamp(&buf));
        assert_eq!(ICMP_HEADER_SIZE as u8, buf[ICMP_HEADER_SIZE]);
    }

    #[test]
    fn embedded_timestamp_reads_back_with_microsecond_resolution() {
        let send_time = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_789);
        let buf = request(56, 0, Some(send_time));
        assert_eq!(Some(UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_000)), read_timestamp(&buf));
    }

    #[test]
    fn buffer_smaller_than_header_is_not_encoded() {
        let mut buf = [0u8; 4];
        assert_eq!(None, encode_echo_request(&mut buf, IDENT, SequenceNumber::from(0u16), None));
    }

    #[test]
    fn too_short_for_every_header_length() {
        for ihl in 5u8..=15 {
            let ip_header_len = usize::from(ihl) * 4;
            for len in 1..ip_header_len + ICMP_HEADER_SIZE {
                let mut buf = vec![0u8; len];
                buf[0] = 0x40 | ihl;
                assert_eq!(
                    Err(Rejection::TooShort { len, needed: ip_header_len + ICMP_HEADER_SIZE }),
                    decode_echo_reply(&buf, IDENT)
                );
            }
        }
    }

    #[test]
    fn empty_datagram_is_too_short() {
        assert!(matches!(decode_echo_reply(&[], IDENT), Err(Rejection::TooShort { len: 0, .. })));
    }

    #[test]
    fn matching_reply_is_accepted() {
        let datagram = echo_reply_datagram(&request(56, 3, None), 5);
        let reply = decode_echo_reply(&datagram, IDENT).unwrap();
        assert_eq!(0, reply.icmp_type);
        assert_eq!(IDENT, reply.identifier);
        assert_eq!(SequenceNumber::from(3), reply.sequence_number);
    }

    #[test]
    fn ip_options_are_skipped() {
        let datagram = echo_reply_datagram(&request(0, 9, None), 15);
        let reply = decode_echo_reply(&datagram, IDENT).unwrap();
        assert_eq!(SequenceNumber::from(9), reply.sequence_number);
    }

    #[test]
    fn request_echoed_back_unchanged_has_wrong_type() {
        let mut datagram = echo_reply_datagram(&request(8, 0, None), 5);
        datagram[20] = 8;
        assert_eq!(Err(Rejection::WrongType { icmp_type: 8, code: 0 }), decode_echo_reply(&datagram, IDENT));
    }

    #[test]
    fn destination_unreachable_has_wrong_type() {
        let mut datagram = echo_reply_datagram(&request(8, 0, None), 5);
        datagram[20] = 3;
        datagram[21] = 1;
        assert_eq!(Err(Rejection::WrongType { icmp_type: 3, code: 1 }), decode_echo_reply(&datagram, IDENT));
    }

    #[test]
    fn reply_for_other_process_is_rejected() {
        let datagram = echo_reply_datagram(&request(8, 0, None), 5);
        assert_eq!(Err(Rejection::ForeignIdentifier { identifier: IDENT }), decode_echo_reply(&datagram, 0x4321));
    }

    #[test]
    fn round_trip_is_whole_milliseconds() {
        let sent = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(237, round_trip_millis(sent, sent + Duration::from_millis(237)));
        assert_eq!(237, round_trip_millis(sent, sent + Duration::from_micros(237_999)));
        assert_eq!(1_500, round_trip_millis(sent, sent + Duration::from_millis(1_500)));
    }

    #[test]
    fn round_trip_backwards_clock_is_zero() {
        let sent = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(0, round_trip_millis(sent, sent - Duration::from_millis(5)));
    }

    #[test]
    fn timing_needs_room_for_timestamp() {
        assert!(!timing_enabled(15));
        assert!(timing_enabled(16));
        assert!(timing_enabled(56));
    }

    #[test]
    fn rejection_display() {
        assert_eq!("icmp_type=3 code=1", Rejection::WrongType { icmp_type: 3, code: 1 }.to_string());
        assert_eq!("packet too short (10 bytes, need 28)", Rejection::TooShort { len: 10, needed: 28 }.to_string());
    }
}
