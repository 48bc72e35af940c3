#![no_main]

use libfuzzer_sys::fuzz_target;
use phantom_jam::dataset::{read_traffic_samples, Delimiter};
use phantom_jam::segment::SegmentTable;

fuzz_target!(|data: &[u8]| {
    // Neither loader may panic on arbitrary input
    if let Ok(table) = SegmentTable::read(data) {
        if let Some(first) = table.records().first() {
            let _ = table.segment(first.road_segment_id);
        }
    }
    let _ = read_traffic_samples(data, Delimiter::Sniff);
});
