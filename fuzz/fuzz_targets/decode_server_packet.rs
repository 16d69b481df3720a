#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use native_protocol::{
    BlockHeader, ExceptionPacket, ProfileInfo, Progress, ServerCode, ServerHello,
};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    code: u8,
    body: Vec<u8>,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(code) = ServerCode::from_u64(u64::from(input.code)) else {
        return;
    };
    let mut cursor = &input.body[..];
    match code {
        ServerCode::Hello => {
            let _ = ServerHello::decode(&mut cursor);
        }
        ServerCode::Exception => {
            let _ = ExceptionPacket::decode(&mut cursor);
        }
        ServerCode::Progress => {
            let _ = Progress::decode(&mut cursor);
        }
        ServerCode::ProfileInfo => {
            let _ = ProfileInfo::decode(&mut cursor);
        }
        _ => {
            let _ = BlockHeader::decode(&mut cursor);
        }
    }
});
