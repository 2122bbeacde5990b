//! Reversible substitution codec.
//!
//! Letters rotate forward three places within their own case, decimal
//! digits map `d -> 9 - d`, every other byte passes through. Each byte is
//! transformed independently, so output length always equals input length.

const SHIFT: u8 = 3;

const fn build_table(forward: bool) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let b = i as u8;
        table[i] = match b {
            b'a'..=b'z' => rotate(b, b'a', forward),
            b'A'..=b'Z' => rotate(b, b'A', forward),
            b'0'..=b'9' => b'9' - (b - b'0'),
            _ => b,
        };
        i += 1;
    }
    table
}

const fn rotate(b: u8, base: u8, forward: bool) -> u8 {
    let offset = b - base;
    let shifted = if forward {
        (offset + SHIFT) % 26
    } else {
        (offset + 26 - SHIFT) % 26
    };
    base + shifted
}

static ENCODE_TABLE: [u8; 256] = build_table(true);
static DECODE_TABLE: [u8; 256] = build_table(false);

/// Encode a buffer in place
pub fn encode_in_place(data: &mut [u8]) {
    for byte in data.iter_mut() {
        *byte = ENCODE_TABLE[*byte as usize];
    }
}

/// Decode a buffer in place
pub fn decode_in_place(data: &mut [u8]) {
    for byte in data.iter_mut() {
        *byte = DECODE_TABLE[*byte as usize];
    }
}

pub fn encode(data: &[u8]) -> Vec<u8> {
    data.iter().map(|&b| ENCODE_TABLE[b as usize]).collect()
}

pub fn decode(data: &[u8]) -> Vec<u8> {
    data.iter().map(|&b| DECODE_TABLE[b as usize]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_known_text() {
        assert_eq!(encode(b"Hello123"), b"Khoor876");
        assert_eq!(decode(b"Khoor876"), b"Hello123");
    }

    #[test]
    fn test_alphabet_wraps() {
        assert_eq!(encode(b"xyzXYZ"), b"abcABC");
        assert_eq!(decode(b"abcABC"), b"xyzXYZ");
    }

    #[test]
    fn test_digits_complement() {
        assert_eq!(encode(b"0123456789"), b"9876543210");
        assert_eq!(decode(b"9876543210"), b"0123456789");
    }

    #[test]
    fn test_non_alphanumeric_passthrough() {
        let data: Vec<u8> = (0u8..=255)
            .filter(|b| !b.is_ascii_alphanumeric())
            .collect();
        assert_eq!(encode(&data), data);
        assert_eq!(decode(&data), data);
    }

    #[test]
    fn test_in_place_matches_allocating() {
        let original = b"The Quick Brown Fox, 42 times\n".to_vec();
        let mut buf = original.clone();
        encode_in_place(&mut buf);
        assert_eq!(buf, encode(&original));
        decode_in_place(&mut buf);
        assert_eq!(buf, original);
    }

    #[test]
    fn test_empty() {
        assert!(encode(b"").is_empty());
        assert!(decode(b"").is_empty());
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let encoded = encode(&data);
            prop_assert_eq!(encoded.len(), data.len());
            prop_assert_eq!(decode(&encoded), data);
        }

        #[test]
        fn prop_encode_inverts_decode(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(encode(&decode(&data)), data);
        }
    }
}
