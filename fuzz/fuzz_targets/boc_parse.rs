#![no_main]

use libfuzzer_sys::fuzz_target;
use tonwallet_core::cell::{deserialize_boc, serialize_boc};

fuzz_target!(|data: &[u8]| {
    // deserialize_boc must never panic on untrusted bytes
    if let Ok(root) = deserialize_boc(data) {
        let bytes = serialize_boc(&root);
        let again = deserialize_boc(&bytes).expect("serialized bag decodes");
        assert_eq!(root.hash(), again.hash());
    }
});
