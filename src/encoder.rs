//! Base-62 mapping between numeric link ids and short codes.

/// Digits first, then uppercase, then lowercase. Changing the order changes
/// every code ever issued.
const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE: u64 = ALPHABET.len() as u64;

/// Encode `id` as a base-62 string with no padding. `encode(0)` is `"0"`.
pub fn encode(mut id: u64) -> String {
    if id == 0 {
        return (ALPHABET[0] as char).to_string();
    }

    let mut symbols = Vec::with_capacity(11);
    while id > 0 {
        symbols.push(ALPHABET[(id % BASE) as usize]);
        id /= BASE;
    }
    symbols.reverse();

    // Every byte comes from ALPHABET, so this is always ASCII.
    symbols.into_iter().map(char::from).collect()
}

/// Inverse of [`encode`] for diagnostics only.
///
/// Returns `0` when `code` contains a symbol outside the alphabet or does not
/// fit in a `u64`. Lookups always go by the string key, never through this.
pub fn decode(code: &str) -> u64 {
    let mut id: u64 = 0;
    for byte in code.bytes() {
        let Some(pos) = ALPHABET.iter().position(|&c| c == byte) else {
            return 0;
        };
        id = match id.checked_mul(BASE).and_then(|v| v.checked_add(pos as u64)) {
            Some(v) => v,
            None => return 0,
        };
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_first_symbol() {
        assert_eq!(encode(0), "0");
    }

    #[test]
    fn known_values() {
        assert_eq!(encode(9), "9");
        assert_eq!(encode(10), "A");
        assert_eq!(encode(35), "Z");
        assert_eq!(encode(36), "a");
        assert_eq!(encode(61), "z");
        assert_eq!(encode(62), "10");
        assert_eq!(encode(62 * 62), "100");
    }

    #[test]
    fn round_trip_holds_for_encoded_values() {
        let samples = [0u64, 1, 61, 62, 3_843, 3_844, 1_000_000, 3_521_614_606_207, u64::MAX];
        for n in samples {
            let code = encode(n);
            assert_eq!(decode(&code), n, "decode(encode({n}))");
            assert_eq!(encode(decode(&code)), code);
        }
    }

    #[test]
    fn output_stays_in_alphabet() {
        for n in (0..50_000u64).step_by(7) {
            assert!(encode(n).bytes().all(|b| ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn ordering_is_increasing_by_length_then_lexicographic() {
        let mut prev = (0usize, String::new());
        for n in 0..20_000u64 {
            let code = encode(n);
            let key = (code.len(), code);
            if n > 0 {
                assert!(key > prev, "encode({n}) = {:?} not after {:?}", key.1, prev.1);
            }
            prev = key;
        }
    }

    #[test]
    fn seven_symbols_cover_trillions() {
        assert_eq!(encode(62u64.pow(7) - 1).len(), 7);
        assert_eq!(encode(62u64.pow(7)).len(), 8);
    }

    #[test]
    fn decode_rejects_foreign_symbols() {
        assert_eq!(decode("ab-c"), 0);
        assert_eq!(decode("héllo"), 0);
        assert_eq!(decode(""), 0);
    }

    #[test]
    fn decode_overflow_is_zero() {
        assert_eq!(decode("zzzzzzzzzzzzzzzz"), 0);
    }
}
