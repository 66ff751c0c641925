//! Human-shareable room identifiers: nine symbols from an unambiguous
//! alphabet, grouped as `XXX-XXX-XXX`.

use rand::Rng;

/// Uppercase alphanumerics minus the visually ambiguous 0/1/I/O.
const ALPHABET: &[u8] = b"23456789ABCDEFGHJKLMNPQRSTUVWXYZ";

pub fn random_room_id(rng: &mut impl Rng) -> String {
    let raw: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{}-{}", &raw[0..3], &raw[3..6], &raw[6..9])
}

/// Uppercase, drop a pasted `ROOM` prefix and any separators, and re-group
/// into hyphenated triplets. The result still needs [`is_valid_room_id`].
pub fn normalize_room_id(id: &str) -> String {
    let mut id = id.to_uppercase();
    if let Some(rest) = id.strip_prefix("ROOM") {
        if rest.starts_with(|c: char| !c.is_ascii_alphanumeric()) {
            id = rest.to_string();
        }
    }
    let symbols: String = id.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if symbols.len() < 6 {
        return symbols;
    }
    format!("{}-{}-{}", &symbols[0..3], &symbols[3..6], &symbols[6..])
}

pub fn is_valid_room_id(id: &str) -> bool {
    let bytes = id.as_bytes();
    if bytes.len() != 11 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, &b)| match i {
        3 | 7 => b == b'-',
        _ => b.is_ascii_uppercase() || b.is_ascii_digit(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn generated_ids_are_valid_and_unambiguous() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..100 {
            let id = random_room_id(&mut rng);
            assert!(is_valid_room_id(&id), "{id}");
            for c in id.chars().filter(|c| *c != '-') {
                assert!(!"01IO".contains(c), "ambiguous symbol in {id}");
            }
        }
    }

    #[test]
    fn normalization_regroups_and_uppercases() {
        assert_eq!(normalize_room_id("abc123xyz"), "ABC-123-XYZ");
        assert!(is_valid_room_id(&normalize_room_id("abc123xyz")));

        assert_eq!(normalize_room_id("ABC-123-XYZ"), "ABC-123-XYZ");
        assert_eq!(normalize_room_id("abc 123.xyz"), "ABC-123-XYZ");
    }

    #[test]
    fn room_prefix_is_stripped() {
        assert_eq!(normalize_room_id("room:abc123xyz"), "ABC-123-XYZ");
        // Without a separator the prefix is part of the id.
        assert_eq!(normalize_room_id("roomabc"), "ROO-MAB-C");
    }

    #[test]
    fn overlong_input_fails_validation() {
        let id = normalize_room_id("toolong-id-1234");
        assert!(!is_valid_room_id(&id));
    }

    #[test]
    fn short_input_fails_validation() {
        assert!(!is_valid_room_id(&normalize_room_id("abc")));
        assert!(!is_valid_room_id(""));
    }

    #[test]
    fn wrong_shape_fails_validation() {
        assert!(!is_valid_room_id("ABC_123_XYZ"));
        assert!(!is_valid_room_id("abc-123-xyz"));
        assert!(!is_valid_room_id("ABCD-23-XYZ"));
    }
}
