// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for stored error documents and the multi-map codec

#![no_main]

use errvault_log::codec::{decode, encode};
use errvault_log::ErrorRecord;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes must yield a record or a format error, never a panic.
    let _ = ErrorRecord::from_document(data);

    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) {
        // Anything that decodes must re-encode to an equivalent shape.
        if let Ok(map) = decode(&value) {
            let again = decode(&encode(map.as_ref())).expect("re-encoded map decodes");
            assert_eq!(again.map(|m| m.len()), map.map(|m| m.len()));
        }
    }
});
