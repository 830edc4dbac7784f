//! Internet checksum (RFC 1071) used to guard every RUDP exchange.
//!
//! The checksum treats its input as a sequence of 16-bit big-endian words,
//! sums them with end-around carry folding into 16 bits, and returns the
//! one's complement of the final sum.  An odd trailing byte is padded with a
//! zero byte on the right before being added.
//!
//! Both peers must compute the checksum over the serialised packet with the
//! header's checksum field zeroed — the producer fills the field in after
//! computing, and the verifier zeroes it again before recomputing.  That
//! discipline lives in [`crate::packet`]; this module is a pure function
//! over bytes with no I/O and no protocol knowledge.

/// Compute the Internet checksum over `data`.
///
/// The caller must zero any checksum field embedded in `data` before calling.
pub fn internet_checksum(data: &[u8]) -> u16 {
    let mut sum: u32 = 0;
    let mut i = 0;

    while i + 1 < data.len() {
        sum += u32::from(u16::from_be_bytes([data[i], data[i + 1]]));
        i += 2;
    }
    // Odd trailing byte — pad with a zero byte on the right.
    if i < data.len() {
        sum += u32::from(data[i]) << 8;
    }

    // Fold 32-bit sum into 16 bits.
    while sum >> 16 != 0 {
        sum = (sum & 0xffff) + (sum >> 16);
    }

    !(sum as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_all_ones() {
        // Sum of nothing is 0; complement is 0xFFFF.
        assert_eq!(internet_checksum(&[]), 0xffff);
    }

    #[test]
    fn known_vector() {
        // Classic RFC 1071 §3 example: 0001 f203 f4f5 f6f7 → sum 0xddf2,
        // checksum 0x220d.
        let data = [0x00, 0x01, 0xf2, 0x03, 0xf4, 0xf5, 0xf6, 0xf7];
        assert_eq!(internet_checksum(&data), 0x220d);
    }

    #[test]
    fn single_word() {
        assert_eq!(internet_checksum(&[0x12, 0x34]), !0x1234);
    }

    #[test]
    fn odd_length_pads_trailing_byte() {
        // Trailing 0xAB counts as the word 0xAB00.
        assert_eq!(internet_checksum(&[0xab]), !0xab00u16);
        assert_eq!(
            internet_checksum(&[0x00, 0x01, 0xab]),
            !(0x0001u16.wrapping_add(0xab00))
        );
    }

    #[test]
    fn end_around_carry_folds() {
        // 0xffff + 0x0001 overflows 16 bits; the carry wraps back in.
        let data = [0xff, 0xff, 0x00, 0x01];
        // sum = 0x10000 → fold → 0x0001 → complement 0xfffe
        assert_eq!(internet_checksum(&data), 0xfffe);
    }

    #[test]
    fn verification_property() {
        // Appending the checksum as a word makes the complemented sum zero:
        // checksum(data ++ checksum(data)) == 0.
        let data = [0xde, 0xad, 0xbe, 0xef, 0x01, 0x02];
        let csum = internet_checksum(&data);
        let mut with_csum = data.to_vec();
        with_csum.extend_from_slice(&csum.to_be_bytes());
        assert_eq!(internet_checksum(&with_csum), 0);
    }

    #[test]
    fn sensitive_to_byte_order() {
        assert_ne!(
            internet_checksum(&[0x12, 0x34, 0x56, 0x78]),
            internet_checksum(&[0x34, 0x12, 0x78, 0x56])
        );
    }
}
