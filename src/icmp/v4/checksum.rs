/// Internet checksum (RFC 1071) over `buf`.
///
/// Words are summed in network byte order; a trailing odd byte is padded with a zero byte. The
/// checksum field inside `buf` must be zero when this is called.
pub(crate) fn internet_checksum(buf: &[u8]) -> u16 {
    // Use 32 bits to collect the carries.
    let mut sum: u32 = 0;

    for word in buf.chunks(2) {
        let hi = u32::from(word[0]) << 8;
        let lo = word.get(1).copied().map_or(0, u32::from);
        sum = sum.wrapping_add(hi | lo);
    }

    while sum >> 16 != 0 {
        sum = (sum >> 16) + (sum & 0xffff);
    }

    #[allow(clippy::cast_possible_truncation)]
    let folded = sum as u16;
    !folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn empty_buffer() {
        assert_eq!(0xffff, internet_checksum(&[]));
    }

    #[test]
    fn echo_request_header_only() {
        // type 8, code 0, checksum 0, id 0, seq 0
        let buf = [8u8, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(0xf7ff, internet_checksum(&buf));
    }

    #[test]
    fn odd_length_pads_trailing_byte() {
        assert_eq!(internet_checksum(&[0x12, 0x34, 0x56, 0x00]), internet_checksum(&[0x12, 0x34, 0x56]));
    }

    #[test]
    fn carries_are_folded() {
        let buf = [0xff; 64];
        assert_eq!(0x0000, internet_checksum(&buf));
    }

    #[test]
    fn storing_the_checksum_makes_the_buffer_verify() {
        let mut rng = rand::thread_rng();
        for len in 4..200 {
            let mut buf = vec![0u8; len];
            rng.fill(&mut buf[..]);
            buf[2] = 0;
            buf[3] = 0;
            let checksum = internet_checksum(&buf);
            buf[2..4].copy_from_slice(&checksum.to_be_bytes());
            assert_eq!(0, internet_checksum(&buf), "buffer of length {len} does not verify");
        }
    }

    #[test]
    fn agrees_with_pnet() {
        let mut rng = rand::thread_rng();
        for len in [1usize, 7, 8, 64, 65, 1500] {
            let mut buf = vec![0u8; len];
            rng.fill(&mut buf[..]);
            assert_eq!(pnet_packet::util::checksum(&buf, usize::MAX), internet_checksum(&buf));
        }
    }
}
