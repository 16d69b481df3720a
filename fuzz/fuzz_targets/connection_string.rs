#![no_main]

use ch_client::Config;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(config) = Config::from_connection_string(s) else {
        return;
    };
    let _ = config.to_string();

    // Credentials, database and extra options survive rendering.
    if let Ok(reparsed) = Config::from_connection_string(&config.to_connection_string()) {
        assert_eq!(reparsed.user, config.user);
        assert_eq!(reparsed.database, config.database);
        assert_eq!(reparsed.options, config.options);
    }
});
