#![deny(unsafe_code)]

//! Name hashing for record fields and variant tags.
//!
//! Field names are never transmitted on the wire; both peers derive a 32-bit
//! id from the name and use the id for ordering and lookup. The polynomial
//! constants are part of the wire format: two implementations that must
//! interoperate have to agree on them byte for byte.

/// Hash a field or variant name to its 32-bit wire id.
///
/// Iterates the UTF-8 bytes of `name`, folding each into a running
/// accumulator with `acc * 223 + byte` modulo 2^32.
///
/// Names consisting entirely of ASCII digits whose value fits a `u32` bypass
/// hashing and use their literal value as the id, which lets interface
/// authors pin explicit ids (`"0"`, `"42"`). Anything else, including digit
/// strings that overflow `u32`, hashes as an ordinary name.
pub fn idl_hash(name: &str) -> u32 {
    if let Some(id) = numeric_id(name) {
        return id;
    }
    name.bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(223).wrapping_add(b as u32))
}

fn numeric_id(name: &str) -> Option<u32> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse::<u32>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vectors() {
        // Pinned wire ids; changing the polynomial breaks interop.
        assert_eq!(idl_hash("foo"), 5_097_222);
        assert_eq!(idl_hash("bar"), 4_895_187);
        assert_eq!(idl_hash("value"), 834_174_833);
        assert_eq!(idl_hash("next"), 1_224_901_875);
    }

    #[test]
    fn empty_and_single_byte() {
        assert_eq!(idl_hash(""), 0);
        assert_eq!(idl_hash("a"), 97);
    }

    #[test]
    fn stable_across_calls() {
        assert_eq!(idl_hash("stream_id"), idl_hash("stream_id"));
    }

    #[test]
    fn numeric_names_are_literal_ids() {
        assert_eq!(idl_hash("0"), 0);
        assert_eq!(idl_hash("42"), 42);
        assert_eq!(idl_hash("4294967295"), u32::MAX);
    }

    #[test]
    fn non_canonical_numerics_hash_normally() {
        // Sign characters and u32 overflow are not literal ids.
        assert_ne!(idl_hash("+1"), 1);
        assert_ne!(idl_hash("-1"), 1);
        // One past u32::MAX: falls through to the polynomial.
        assert_eq!(
            idl_hash("4294967296"),
            "4294967296"
                .bytes()
                .fold(0u32, |acc, b| acc.wrapping_mul(223).wrapping_add(b as u32))
        );
    }

    #[test]
    fn unicode_hashes_by_utf8_bytes() {
        let expected = "héllo"
            .bytes()
            .fold(0u32, |acc, b| acc.wrapping_mul(223).wrapping_add(b as u32));
        assert_eq!(idl_hash("héllo"), expected);
    }
}
