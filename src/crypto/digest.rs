use sha2::{Digest, Sha512};

/// SHA-512 over raw bytes.
pub fn sha512(data: &[u8]) -> [u8; 64] {
    Sha512::digest(data).into()
}

/// SHA-512 over UTF-8 text, lowercase hex output. This is the stored form
/// of seed-phrase hashes and the comparison form for their verification.
pub fn sha512_hex(data: &str) -> String {
    hex::encode(sha512(data.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // SHA-512("abc")
        assert_eq!(
            sha512_hex("abc"),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }

    #[test]
    fn hex_is_lowercase_and_128_chars() {
        let digest = sha512_hex("anything");
        assert_eq!(digest.len(), 128);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn exact_match_only() {
        assert_ne!(sha512_hex("word word"), sha512_hex("word  word"));
        assert_ne!(sha512_hex("phrase"), sha512_hex("phrase "));
    }
}
