use crate::error::{AlignError, IngestError};
use chrono::{Datelike, NaiveDate};

/// One Bundestag legislative period (Wahlperiode) as a closed
/// `[start, end]` interval of canonical `YYYYMMDD` integers. Adjacent
/// periods may share a boundary date; lookup resolves it to the earlier
/// period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub number: u8,
    pub start: u32,
    pub end: u32,
}

/// Hand-maintained Wahlperiode table, contiguous from the first Bundestag
/// onward. Period 21 carries a provisional end date; bump it when the next
/// Bundestag convenes.
pub const LEGISLATIVE_PERIODS: [Period; 21] = [
    Period { number: 1, start: 19490907, end: 19531006 },
    Period { number: 2, start: 19531006, end: 19571015 },
    Period { number: 3, start: 19571015, end: 19611017 },
    Period { number: 4, start: 19611017, end: 19651019 },
    Period { number: 5, start: 19651019, end: 19691020 },
    Period { number: 6, start: 19691020, end: 19721213 },
    Period { number: 7, start: 19721213, end: 19761213 },
    Period { number: 8, start: 19761213, end: 19801104 },
    Period { number: 9, start: 19801104, end: 19830329 },
    Period { number: 10, start: 19830329, end: 19870218 },
    Period { number: 11, start: 19870218, end: 19901220 },
    Period { number: 12, start: 19901220, end: 19941110 },
    Period { number: 13, start: 19941110, end: 19981026 },
    Period { number: 14, start: 19981026, end: 20021017 },
    Period { number: 15, start: 20021017, end: 20051018 },
    Period { number: 16, start: 20051018, end: 20091027 },
    Period { number: 17, start: 20091027, end: 20131022 },
    Period { number: 18, start: 20131022, end: 20171024 },
    Period { number: 19, start: 20171024, end: 20211026 },
    Period { number: 20, start: 20211026, end: 20250322 },
    Period { number: 21, start: 20250323, end: 20290322 },
];

/// Convert a calendar date to the canonical `YYYYMMDD` integer.
pub fn date_to_int(date: NaiveDate) -> u32 {
    date.year() as u32 * 10_000 + date.month() * 100 + date.day()
}

/// Parse a source-format `DD.MM.YYYY` date string (ISO `YYYY-MM-DD` is
/// accepted too) and canonicalize it to a `YYYYMMDD` integer.
pub fn convert_date(value: &str) -> Result<u32, IngestError> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%d.%m.%Y")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y-%m-%d"))
        .map(date_to_int)
        .map_err(|error| IngestError::InvalidDate {
            value: value.to_string(),
            details: error.to_string(),
        })
}

/// The period containing `date`. Boundary dates shared by two periods
/// resolve to the earlier one.
pub fn period_containing(date: u32) -> Option<&'static Period> {
    LEGISLATIVE_PERIODS
        .iter()
        .find(|period| period.start <= date && date <= period.end)
}

/// Widen a query window to full legislative periods: the start of the
/// period containing `start` through the end of the period containing
/// `end`. Manifestos are dated to a period's start, so manifesto retrieval
/// always snaps to these bounds. A date outside the table is a
/// configuration error.
pub fn snap_to_periods(start: u32, end: u32) -> Result<(u32, u32), AlignError> {
    let first = period_containing(start).ok_or(AlignError::UncoveredDate(start))?;
    let last = period_containing(end).ok_or(AlignError::UncoveredDate(end))?;
    Ok((first.start, last.end))
}
