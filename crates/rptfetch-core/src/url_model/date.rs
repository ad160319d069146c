//! Publication date embedded in archive filenames.

use chrono::NaiveDate;

const DATE_DIGITS: usize = 8;

/// Finds the first run of 8 consecutive ASCII digits in `filename` and reads it
/// as `YYYYMMDD`.
///
/// Longer digit runs are read from their first 8 digits. Returns `None` when
/// there is no such run or the digits are not a calendar date; an unknown date
/// is not an error.
pub fn parse_filename_date(filename: &str) -> Option<NaiveDate> {
    let bytes = filename.as_bytes();
    let mut run_start = None;
    for (i, b) in bytes.iter().enumerate() {
        if !b.is_ascii_digit() {
            run_start = None;
            continue;
        }
        let start = *run_start.get_or_insert(i);
        if i + 1 - start == DATE_DIGITS {
            let digits = &filename[start..=i];
            let year = digits[0..4].parse().ok()?;
            let month = digits[4..6].parse().ok()?;
            let day = digits[6..8].parse().ok()?;
            return NaiveDate::from_ymd_opt(year, month, day);
        }
    }
    None
}
