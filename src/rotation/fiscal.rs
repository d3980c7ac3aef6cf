//! Fiscal year window and rental agreement numbering
//!
//! The fiscal year runs April 1 to March 31. Agreement numbers carry the
//! calendar year the fiscal year ends in.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};

/// Start of the fiscal year containing `now` (April 1, 00:00 UTC)
pub fn fiscal_year_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let year = if now.month() <= 3 {
        now.year() - 1
    } else {
        now.year()
    };

    let april_first = NaiveDate::from_ymd_opt(year, 4, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("April 1 is always a valid date");
    Utc.from_utc_datetime(&april_first)
}

/// Fiscal year label used in agreement numbers: the year the fiscal year ends in
pub fn agreement_fiscal_year(now: DateTime<Utc>) -> i32 {
    if now.month() > 3 {
        now.year() + 1
    } else {
        now.year()
    }
}

/// Format `{fiscalYear}-{localAreaNumber}-{sequence:04}`
pub fn agreement_number(fiscal_year: i32, local_area_number: i32, sequence: i64) -> String {
    format!("{}-{}-{:04}", fiscal_year, local_area_number, sequence)
}
