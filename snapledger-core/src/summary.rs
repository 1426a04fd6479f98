//! Human-readable summaries of extracted records.

use crate::record::TransactionRecord;

fn noun(count: usize) -> &'static str {
    if count == 1 { "transaction" } else { "transactions" }
}

/// Header line, e.g. `Recorded 2 transactions:`.
pub fn summary_header(count: usize) -> String {
    format!("Recorded {count} {}:", noun(count))
}

/// Header for records that were extracted but never written.
pub fn unsaved_header(count: usize) -> String {
    format!("Extracted {count} {} (not saved):", noun(count))
}

/// One `N. date | merchant | amount | category` line per record, numbered from 1.
pub fn summary_lines(records: &[TransactionRecord]) -> Vec<String> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let fields = [
                r.date_text(),
                r.merchant.clone().unwrap_or_default(),
                r.amount_text(),
                r.category.map(|c| c.label().to_string()).unwrap_or_default(),
            ];
            format!("{}. {}", i + 1, fields.join(" | "))
        })
        .collect()
}

pub fn format_summary(records: &[TransactionRecord]) -> String {
    compose(summary_header(records.len()), records)
}

pub fn format_unsaved_summary(records: &[TransactionRecord]) -> String {
    compose(unsaved_header(records.len()), records)
}

fn compose(header: String, records: &[TransactionRecord]) -> String {
    let mut out = header;
    for line in summary_lines(records) {
        out.push('\n');
        out.push_str(&line);
    }
    out
}
