// VinSplit - core/dates.rs
//
// Retail date recognition for spreadsheet cells: Excel serial numbers and the
// text layouts found in exported dispatch registers.

use crate::util::constants;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// How to read an all-numeric date whose first two fields could both be a
/// month, such as `03/04/2025`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateOrder {
    /// 03/04/2025 is 3 April.
    #[default]
    DayFirst,
    /// 03/04/2025 is 4 March.
    MonthFirst,
}

impl DateOrder {
    pub fn label(&self) -> &'static str {
        match self {
            DateOrder::DayFirst => "day-first",
            DateOrder::MonthFirst => "month-first",
        }
    }
}

// =============================================================================
// Excel serials
// =============================================================================

/// Convert an Excel (1900 date system) serial to a date and time.
///
/// Accepts 1 (1900-01-01) through 2958465 (9999-12-31). Serials below 61
/// are shifted by one day to undo Excel's phantom 1900-02-29.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(1.0..=constants::MAX_EXCEL_SERIAL + 0.999_999).contains(&serial)
    {
        return None;
    }
    let mut days = serial.trunc() as i64;
    if days < 61 {
        days += 1;
    }
    let seconds = ((serial.fract()) * 86_400.0).round() as i64;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    epoch.checked_add_signed(Duration::days(days) + Duration::seconds(seconds))
}

/// Date part of an Excel serial.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    excel_serial_to_datetime(serial).map(|dt| dt.date())
}

/// Excel serial of a date; the inverse of `excel_serial_to_date`.
pub fn date_to_excel_serial(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN);
    let mut days = (date - epoch).num_days();
    if days < 61 {
        days -= 1;
    }
    days as f64
}

// =============================================================================
// Text dates
// =============================================================================

/// Parse a date written as text.
///
/// Layouts are tried from most to least specific; the first one whose regex
/// matches the whole trimmed value decides. Any time-of-day suffix is
/// discarded.
pub fn parse_date_text(raw: &str, order: DateOrder) -> Option<NaiveDate> {
    struct Layout {
        re: Regex,
        parse: fn(&regex::Captures<'_>, DateOrder) -> Option<NaiveDate>,
    }

    static LAYOUTS: OnceLock<Vec<Layout>> = OnceLock::new();

    let layouts = LAYOUTS.get_or_init(|| {
        // Patterns are exercised by the unit tests below.
        fn re(pat: &str) -> Regex {
            Regex::new(pat).expect("parse_date_text: invalid regex")
        }

        vec![
            // 2025-05-31, 2025-05-31T08:15:00Z, 2025/05/31 08:15, 2025.05.31
            Layout {
                re: re(r"^(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})(?:[T ].*)?$"),
                parse: |c, _| ymd(num(c, 1)?, num(c, 2)?, num(c, 3)?),
            },
            // 31/05/2025, 05-31-2025, 31.05.25, 31/05/2025 14:02
            Layout {
                re: re(r"^(\d{1,2})[-/.](\d{1,2})[-/.](\d{4}|\d{2})(?:[T ].*)?$"),
                parse: |c, order| {
                    let (first, second) = (num(c, 1)?, num(c, 2)?);
                    let year = full_year(num(c, 3)?, c.get(3)?.as_str().len());
                    numeric_day_month(first, second, year, order)
                },
            },
            // 31-May-2025, 31 May 2025, 31-May-25, 31 May, 2025
            Layout {
                re: re(r"^(\d{1,2})[-/ ]+([A-Za-z]{3,9})\.?[-/, ]+(\d{4}|\d{2})(?:[T ].*)?$"),
                parse: |c, _| {
                    let year = full_year(num(c, 3)?, c.get(3)?.as_str().len());
                    ymd(year, month_from_name(c.get(2)?.as_str())?, num(c, 1)?)
                },
            },
            // May 31, 2025 / May 31 2025
            Layout {
                re: re(r"^([A-Za-z]{3,9})\.? +(\d{1,2})(?:st|nd|rd|th)?,? +(\d{4})(?:[T ].*)?$"),
                parse: |c, _| ymd(num(c, 3)?, month_from_name(c.get(1)?.as_str())?, num(c, 2)?),
            },
            // 20250531
            Layout {
                re: re(r"^(\d{4})(\d{2})(\d{2})$"),
                parse: |c, _| {
                    let year = num(c, 1)?;
                    if !(1900..=2100).contains(&year) {
                        return None;
                    }
                    ymd(year, num(c, 2)?, num(c, 3)?)
                },
            },
            // 45808 or 45808.0: a serial that arrived as text
            Layout {
                re: re(r"^(\d{1,7}(?:\.\d+)?)$"),
                parse: |c, _| c.get(1)?.as_str().parse::<f64>().ok().and_then(excel_serial_to_date),
            },
        ]
    });

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    layouts.iter().find_map(|layout| {
        layout
            .re
            .captures(trimmed)
            .and_then(|caps| (layout.parse)(&caps, order))
    })
}

fn num(caps: &regex::Captures<'_>, group: usize) -> Option<i32> {
    caps.get(group)?.as_str().parse().ok()
}

fn ymd(year: i32, month: i32, day: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, u32::try_from(month).ok()?, u32::try_from(day).ok()?)
}

/// Expand a two-digit year: 00-69 -> 2000s, 70-99 -> 1900s.
fn full_year(year: i32, digits: usize) -> i32 {
    if digits > 2 {
        year
    } else if year < 70 {
        2000 + year
    } else {
        1900 + year
    }
}

/// Resolve an all-numeric day/month pair.
///
/// A field above 12 cannot be a month, so either layout is decided by it.
/// Only when both fields are 12 or below does `order` choose.
fn numeric_day_month(first: i32, second: i32, year: i32, order: DateOrder) -> Option<NaiveDate> {
    if first > 12 {
        ymd(year, second, first)
    } else if second > 12 {
        ymd(year, first, second)
    } else {
        match order {
            DateOrder::DayFirst => ymd(year, second, first),
            DateOrder::MonthFirst => ymd(year, first, second),
        }
    }
}

fn month_from_name(name: &str) -> Option<i32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = name.to_lowercase();
    let prefix = lower.get(..3)?;
    let idx = MONTHS.iter().position(|m| *m == prefix)?;
    // Reject words that merely start like a month ("Marketing").
    const FULL: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    let ok = lower.len() == 3 || FULL[idx].starts_with(&lower) || lower == "sept";
    ok.then_some(idx as i32 + 1)
}
