use rand::Rng;

pub const PREFIX: &str = "DON";
pub const SUFFIX_LEN: usize = 8;

const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Draw a candidate donor id, e.g. `DON4B7X9K2A`.
///
/// Not cryptographically secure, and not checked for uniqueness here. The
/// submission pipeline checks candidates against the store.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> String {
    let mut id = String::with_capacity(PREFIX.len() + SUFFIX_LEN);
    id.push_str(PREFIX);
    for _ in 0..SUFFIX_LEN {
        let idx = rng.random_range(0..ALPHABET.len());
        id.push(ALPHABET[idx] as char);
    }
    id
}

/// Draw a candidate from the thread-local generator.
pub fn generate_random() -> String {
    generate(&mut rand::rng())
}

pub fn is_valid(id: &str) -> bool {
    let Some(suffix) = id.strip_prefix(PREFIX) else {
        return false;
    };
    suffix.len() == SUFFIX_LEN
        && suffix
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
