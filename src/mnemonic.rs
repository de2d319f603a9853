//! Twelve-word recovery phrases.
//!
//! A phrase is derived from 128 bits of fresh entropy plus a 4-bit checksum
//! taken from SHA-512 of the entropy's hex form. The phrase itself is shown
//! to the user exactly once; only its SHA-512 hex digest is ever stored.

use std::fs;
use std::path::Path;

use crate::crypto::{aead, digest};
use crate::error::{Error, Result};

/// Required dictionary size; word indices are 11-bit.
pub const WORD_COUNT: usize = 2048;
/// Words per phrase.
pub const PHRASE_WORDS: usize = 12;

const ENTROPY_LEN: usize = 16;

/// The fixed, ordered mnemonic dictionary.
pub struct WordList {
    words: Vec<String>,
}

impl WordList {
    /// Load a newline-separated dictionary file. Fewer than 2048 usable
    /// words is a fatal configuration error, not a degraded mode.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read word list {}: {e}", path.display()))
        })?;
        Self::from_lines(&text)
    }

    pub fn from_lines(text: &str) -> Result<Self> {
        let words: Vec<String> = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();

        if words.len() < WORD_COUNT {
            return Err(Error::Config(format!(
                "word list holds {} words, {WORD_COUNT} required",
                words.len()
            )));
        }
        Ok(Self { words })
    }

    /// Draw fresh entropy and map it to a twelve-word phrase.
    pub fn generate(&self) -> Result<Vec<String>> {
        let entropy: [u8; ENTROPY_LEN] = aead::random_array()?;
        Ok(self.phrase_from_entropy(&entropy))
    }

    fn phrase_from_entropy(&self, entropy: &[u8; ENTROPY_LEN]) -> Vec<String> {
        word_indices(entropy)
            .iter()
            .map(|&index| self.words[index].clone())
            .collect()
    }
}

/// Derive the twelve 11-bit word indices from 16 entropy bytes.
///
/// SHA-512 of the hex-encoded entropy contributes its first byte's top
/// nibble as a checksum, appended as one extra byte; the first 132 bits of
/// that buffer are then consumed most-significant-bit first. The modulo is
/// a safety net — an 11-bit group already fits the dictionary.
fn word_indices(entropy: &[u8; ENTROPY_LEN]) -> [usize; PHRASE_WORDS] {
    let checksum = digest::sha512(hex::encode(entropy).as_bytes())[0] >> 4;
    let mut buf = entropy.to_vec();
    buf.push(checksum);

    let mut indices = [0usize; PHRASE_WORDS];
    let mut bit = 0usize;
    for index in indices.iter_mut() {
        let mut value = 0usize;
        for _ in 0..11 {
            let byte = buf[bit / 8];
            let set = byte & (1 << (7 - bit % 8)) != 0;
            value = (value << 1) | usize::from(set);
            bit += 1;
        }
        *index = value % WORD_COUNT;
    }
    indices
}

/// The stored form of a phrase: single-space joined, SHA-512, hex.
pub fn phrase_hash(words: &[String]) -> String {
    digest::sha512_hex(&words.join(" "))
}

/// Exact-match verification of a candidate phrase. The candidate is
/// re-joined with single spaces (one whitespace normalization, no per-word
/// trimming or fuzzy matching) and its digest compared byte for byte.
pub fn verify(phrase: &str, stored_hash: &str) -> bool {
    let joined = phrase.split_whitespace().collect::<Vec<_>>().join(" ");
    digest::sha512_hex(&joined) == stored_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_words() -> WordList {
        let text: String = (0..WORD_COUNT)
            .map(|i| format!("word{i:04}\n"))
            .collect();
        WordList::from_lines(&text).unwrap()
    }

    #[test]
    fn short_dictionary_is_fatal() {
        let text: String = (0..WORD_COUNT - 1).map(|i| format!("w{i}\n")).collect();
        assert!(matches!(
            WordList::from_lines(&text),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn blank_lines_do_not_count() {
        let mut text: String = (0..WORD_COUNT - 1).map(|i| format!("w{i}\n")).collect();
        text.push_str("\n\n  \n");
        assert!(WordList::from_lines(&text).is_err());
    }

    #[test]
    fn indices_are_deterministic() {
        let entropy = [0xA5u8; ENTROPY_LEN];
        assert_eq!(word_indices(&entropy), word_indices(&entropy));
    }

    #[test]
    fn indices_fit_the_dictionary() {
        let entropy = [0xFFu8; ENTROPY_LEN];
        for index in word_indices(&entropy) {
            assert!(index < WORD_COUNT);
        }
    }

    #[test]
    fn single_bit_flip_changes_some_index() {
        let base = [0x3Cu8; ENTROPY_LEN];
        let mut flipped = base;
        flipped[0] ^= 0x80;
        assert_ne!(word_indices(&base), word_indices(&flipped));
    }

    #[test]
    fn known_indices_for_zero_entropy() {
        // All-zero entropy: every 11-bit group of the first 128 bits is
        // zero, and the final group is the last 7 entropy bits followed by
        // the top 4 bits of the checksum byte (itself 0000xxxx), so the
        // twelfth index is zero too.
        assert_eq!(word_indices(&[0u8; ENTROPY_LEN]), [0usize; PHRASE_WORDS]);
    }

    #[test]
    fn generated_phrase_has_twelve_words() {
        let words = test_words();
        let phrase = words.generate().unwrap();
        assert_eq!(phrase.len(), PHRASE_WORDS);
    }

    #[test]
    fn phrase_hash_matches_verify() {
        let phrase: Vec<String> = (0..PHRASE_WORDS).map(|i| format!("word{i:04}")).collect();
        let hash = phrase_hash(&phrase);
        assert!(verify(&phrase.join(" "), &hash));
    }

    #[test]
    fn verify_normalizes_whitespace_once() {
        let phrase: Vec<String> = (0..PHRASE_WORDS).map(|i| format!("word{i:04}")).collect();
        let hash = phrase_hash(&phrase);
        assert!(verify(&format!("  {}  ", phrase.join("   ")), &hash));
    }

    #[test]
    fn verify_rejects_any_word_change() {
        let phrase: Vec<String> = (0..PHRASE_WORDS).map(|i| format!("word{i:04}")).collect();
        let hash = phrase_hash(&phrase);

        let mut wrong = phrase.clone();
        wrong[11] = "word9999".to_string();
        assert!(!verify(&wrong.join(" "), &hash));
    }
}
