#![no_main]

use libfuzzer_sys::fuzz_target;
use native_protocol::ClientPacket;

fuzz_target!(|data: &[u8]| {
    let mut cursor = data;
    while !cursor.is_empty() {
        if ClientPacket::decode(&mut cursor).is_err() {
            break;
        }
    }
});
