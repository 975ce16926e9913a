#![no_main]

use std::path::Path;

use cryptic::config::ConfigLoader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        // any outcome but a panic is fine
        let _ = ConfigLoader::parse(yaml_str, Path::new("<fuzz>"));
    }
});
