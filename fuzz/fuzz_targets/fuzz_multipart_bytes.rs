#![no_main]

use libfuzzer_sys::fuzz_target;
use multipart_push::{MultipartParser, PartCollector};

fn collect(chunks: &[&[u8]]) -> Option<Vec<(usize, Vec<u8>)>> {
    let mut parser = MultipartParser::new("X-BOUNDARY", PartCollector::new()).ok()?;
    for chunk in chunks {
        if parser.parse(chunk).is_err() {
            return None;
        }
    }

    let parts = parser.into_handler().into_parts();
    Some(
        parts
            .into_iter()
            .map(|part| (part.headers().len(), part.into_bytes().to_vec()))
            .collect(),
    )
}

fuzz_target!(|data: &[u8]| {
    // the first byte picks the chunk size, the rest is the body
    let (size, body) = match data.split_first() {
        Some((size, body)) => (usize::from(*size).max(1), body),
        None => return,
    };

    let chunks: Vec<&[u8]> = body.chunks(size).collect();
    assert_eq!(collect(&[body]), collect(&chunks));
});
