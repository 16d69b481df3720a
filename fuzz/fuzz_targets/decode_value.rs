#![no_main]

use std::io::Cursor;

use arbitrary::Arbitrary;
use ch_codec::{InputStream, Transport, TransportTimeouts};
use ch_types::DataType;
use libfuzzer_sys::fuzz_target;

/// A type descriptor with the bytes to read a value of that type from.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    descriptor: String,
    data: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(data_type) = DataType::parse(&input.descriptor) else {
        return;
    };
    let Ok(rt) = tokio::runtime::Builder::new_current_thread().build() else {
        return;
    };
    rt.block_on(async {
        let transport = Transport::from_stream(Cursor::new(input.data), TransportTimeouts::default());
        let mut stream = InputStream::new(transport);
        let _ = data_type.read_value(&mut stream).await;
    });
});
