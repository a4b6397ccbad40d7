#![no_main]

use libfuzzer_sys::fuzz_target;
use tonwallet_core::Amount;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(amount) = Amount::from_decimal_str(s) {
            assert!(amount.as_nano() > 0);
            let text = amount.to_decimal_string();
            assert_eq!(Amount::from_decimal_str(&text).ok(), Some(amount));
        }
    }
});
