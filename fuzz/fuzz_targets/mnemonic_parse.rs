#![no_main]

use libfuzzer_sys::fuzz_target;
use tonwallet_core::{decode_phrase, encode_seed};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // any phrase that decodes must re-encode to a phrase with the same seed
        if let Ok(seed) = decode_phrase(s) {
            let phrase = encode_seed(&seed).expect("valid seed encodes");
            let again = decode_phrase(phrase.as_str()).expect("encoded phrase decodes");
            assert_eq!(seed.as_bytes(), again.as_bytes());
        }
    }
});
