#![no_main]

use ch_types::DataType;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(descriptor) = std::str::from_utf8(data) {
        if let Ok(data_type) = DataType::parse(descriptor) {
            let _ = data_type.name();
            let _ = data_type.is_nullable();
        }
    }
});
