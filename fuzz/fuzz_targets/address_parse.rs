#![no_main]

use libfuzzer_sys::fuzz_target;
use tonwallet_core::parse_address;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(address) = parse_address(s) {
            let friendly = address.to_friendly(address.bounceable, address.testnet);
            let reparsed = parse_address(&friendly).expect("friendly form parses");
            assert_eq!(reparsed, address);
            assert_eq!(parse_address(&address.to_raw()).expect("raw form parses"), address);
        }
    }
});
