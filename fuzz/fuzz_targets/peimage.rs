#![no_main]

use libfuzzer_sys::fuzz_target;
use pescope::{ParserConfig, PeImage};

fuzz_target!(|data: &[u8]| {
    let _ = PeImage::from_mem(data.to_vec());
    let _ = PeImage::from_mem_with_config(data.to_vec(), ParserConfig::strict());
});
