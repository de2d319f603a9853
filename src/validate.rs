//! Input rules and password utilities.
//!
//! Validation runs before any network or crypto work; the strength score,
//! weak-password check, and generator serve the interactive client.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::crypto::aead;
use crate::error::{Error, Result};

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 30;
pub const PASSWORD_MIN: usize = 8;
pub const CODE_WORD_MIN: usize = 3;
pub const CODE_WORD_MAX: usize = 30;

const SPECIAL_CHARS: &str = "!@#$%^&*()_+-=[]{}|;:,.<>?/~`'\"\\";

/// Fallback blocklist used when no external weak-password list is
/// configured.
const BUILTIN_WEAK: [&str; 15] = [
    "password", "123456", "12345678", "qwerty", "abc123", "monkey", "1234567", "letmein",
    "trustno1", "dragon", "baseball", "iloveyou", "master", "sunshine", "ashley",
];

/// Usernames are 3–30 characters. They also name vault blob files on disk,
/// so the accepted alphabet is filename-safe.
pub fn validate_username(username: &str) -> Result<()> {
    let length = username.chars().count();
    if length < USERNAME_MIN {
        return Err(Error::Validation(format!(
            "username must be at least {USERNAME_MIN} characters"
        )));
    }
    if length > USERNAME_MAX {
        return Err(Error::Validation(format!(
            "username must be at most {USERNAME_MAX} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(Error::Validation(
            "username may only contain letters, digits, '.', '_' and '-'".into(),
        ));
    }
    Ok(())
}

/// Passwords need at least 8 characters with one lowercase, one uppercase,
/// one digit, and one punctuation-class character.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < PASSWORD_MIN {
        return Err(Error::Validation(format!(
            "password must be at least {PASSWORD_MIN} characters"
        )));
    }

    let classes = CharClasses::of(password);
    if !classes.lower {
        return Err(Error::Validation(
            "password must contain at least one lowercase letter".into(),
        ));
    }
    if !classes.upper {
        return Err(Error::Validation(
            "password must contain at least one uppercase letter".into(),
        ));
    }
    if !classes.digit {
        return Err(Error::Validation(
            "password must contain at least one digit".into(),
        ));
    }
    if !classes.special {
        return Err(Error::Validation(
            "password must contain at least one special character (!@#$%^&* ...)".into(),
        ));
    }
    Ok(())
}

/// The codeword never leaves the client; only its length is constrained.
pub fn validate_code_word(code_word: &str) -> Result<()> {
    let length = code_word.chars().count();
    if length < CODE_WORD_MIN {
        return Err(Error::Validation(format!(
            "code word must be at least {CODE_WORD_MIN} characters"
        )));
    }
    if length > CODE_WORD_MAX {
        return Err(Error::Validation(format!(
            "code word must be at most {CODE_WORD_MAX} characters"
        )));
    }
    Ok(())
}

struct CharClasses {
    lower: bool,
    upper: bool,
    digit: bool,
    special: bool,
}

impl CharClasses {
    fn of(text: &str) -> Self {
        let mut classes = Self {
            lower: false,
            upper: false,
            digit: false,
            special: false,
        };
        for c in text.chars() {
            if c.is_ascii_lowercase() {
                classes.lower = true;
            } else if c.is_ascii_uppercase() {
                classes.upper = true;
            } else if c.is_ascii_digit() {
                classes.digit = true;
            } else if SPECIAL_CHARS.contains(c) {
                classes.special = true;
            }
        }
        classes
    }

    fn diversity(&self) -> u32 {
        u32::from(self.lower) + u32::from(self.upper) + u32::from(self.digit)
            + u32::from(self.special)
    }
}

/// Coarse strength score, 0–100.
pub fn password_strength(password: &str) -> u8 {
    let mut score = 0u32;
    let length = password.chars().count();

    if length >= 8 {
        score += 20;
    }
    if length >= 12 {
        score += 10;
    }
    if length >= 16 {
        score += 10;
    }

    let classes = CharClasses::of(password);
    if classes.lower {
        score += 10;
    }
    if classes.upper {
        score += 10;
    }
    if classes.digit {
        score += 10;
    }
    if classes.special {
        score += 15;
    }

    if classes.diversity() >= 3 {
        score += 10;
    }
    if classes.diversity() == 4 {
        score += 5;
    }

    score.min(100) as u8
}

pub fn strength_description(score: u8) -> &'static str {
    match score {
        0..=29 => "very weak",
        30..=49 => "weak",
        50..=69 => "fair",
        70..=89 => "strong",
        _ => "very strong",
    }
}

/// Case-insensitive membership check against a known-password list.
///
/// When `list` is given the file is scanned line by line; a missing or
/// unreadable file degrades to the built-in blocklist rather than failing.
pub fn is_weak_password(password: &str, list: Option<&Path>) -> bool {
    let needle = password.to_lowercase();

    if let Some(path) = list {
        if let Ok(file) = File::open(path) {
            let reader = BufReader::new(file);
            return reader
                .lines()
                .map_while(|line| line.ok())
                .any(|line| line.trim().to_lowercase() == needle);
        }
    }

    BUILTIN_WEAK.contains(&needle.as_str())
}

/// Generate a random password from the selected character classes.
/// Lowercase letters are always included.
pub fn generate_password(
    length: usize,
    use_uppercase: bool,
    use_digits: bool,
    use_special: bool,
) -> Result<String> {
    let mut alphabet = String::from("abcdefghijklmnopqrstuvwxyz");
    if use_uppercase {
        alphabet.push_str("ABCDEFGHIJKLMNOPQRSTUVWXYZ");
    }
    if use_digits {
        alphabet.push_str("0123456789");
    }
    if use_special {
        alphabet.push_str("!@#$%^&*()_+-=[]{}|;:,.<>?");
    }
    let chars: Vec<char> = alphabet.chars().collect();

    // Rejection sampling keeps the draw uniform over the alphabet.
    let limit = (256 / chars.len()) * chars.len();
    let mut password = String::with_capacity(length);
    while password.len() < length {
        let mut buf = [0u8; 64];
        aead::fill_random(&mut buf)?;
        for byte in buf {
            if (byte as usize) < limit {
                password.push(chars[byte as usize % chars.len()]);
                if password.len() == length {
                    break;
                }
            }
        }
    }
    Ok(password)
}
