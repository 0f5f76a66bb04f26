//! Lenient base32 decoding of user supplied secrets.
//!
//! Pasted secrets often carry grouping spaces, lowercase letters, padding or
//! stray punctuation. All of that is dropped before decoding, and any trailing
//! bits that do not fill a whole byte are discarded. An input with nothing
//! usable decodes to an empty key; deciding what that means is up to the
//! caller.

use zeroize::Zeroizing;

const ALPHABET: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";

/// Uppercased base32 symbols of `text`, with padding, whitespace and every
/// character outside the RFC 4648 alphabet removed.
pub fn normalize(text: &str) -> String {
    text.trim_end_matches('=')
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .filter(|c| ALPHABET.contains(*c))
        .collect()
}

/// Decodes `text` into raw key bytes.
pub fn decode(text: &str) -> Zeroizing<Vec<u8>> {
    let symbols = Zeroizing::new(normalize(text));

    // every remaining symbol is in the alphabet, so decoding cannot fail;
    // an unpadded run whose bit count isn't a multiple of 8 is truncated
    let bytes = base32::decode(
        base32::Alphabet::RFC4648 { padding: false },
        symbols.as_str(),
    )
    .unwrap_or_default();

    Zeroizing::new(bytes)
}

/// Whether `text` decodes to at least one key byte.
pub fn is_usable(text: &str) -> bool {
    // 8 bits need at least two 5 bit symbols
    normalize(text).len() >= 2
}
