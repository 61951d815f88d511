#![allow(dead_code)]

use rowscope::{AppEvent, Explorer, RawTable};

/// Three hourly readings with a sign change in `v`.
pub const HOURLY_CSV: &str = "t,v\n\
2024-01-01 00:00:00,1\n\
2024-01-01 01:00:00,-2\n\
2024-01-01 02:00:00,3\n";

pub fn load_csv(csv: &str) -> Explorer {
    let mut explorer = Explorer::default();
    explorer
        .handle(AppEvent::LoadPrimaryCsv(csv.to_string()))
        .expect("Failed to load CSV");
    explorer
}

pub fn load_table(headers: &[&str], rows: &[&[&str]]) -> Explorer {
    let mut explorer = Explorer::default();
    explorer
        .handle(AppEvent::LoadPrimary(RawTable::from_strings(headers, rows)))
        .expect("Failed to load table");
    explorer
}

/// Session over `len` rows of `i,value` with the given window size and step.
pub fn numbered(len: usize, size: i64, step: i64) -> Explorer {
    let records = (0..len)
        .map(|i| {
            vec![
                Some(i.to_string()),
                Some((i as i64 - (len as i64) / 2).to_string()),
            ]
        })
        .collect();
    let table = RawTable::new(vec!["i".to_string(), "value".to_string()], records);
    let mut explorer = Explorer::default();
    explorer
        .handle(AppEvent::LoadPrimary(table))
        .expect("Failed to load table");
    explorer.handle(AppEvent::SetWindowSize(size)).unwrap();
    explorer.handle(AppEvent::SetStep(step)).unwrap();
    explorer
}

pub fn range(explorer: &Explorer) -> std::ops::Range<usize> {
    explorer.window().visible_range()
}
