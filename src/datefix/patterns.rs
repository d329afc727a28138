//! Ordered date-pattern families for scanning message text and filenames.
//!
//! Pattern order is precedence order: families are tried in sequence and
//! within a family matches are scanned left to right. The first match that
//! parses into a valid date wins.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

/// How the capture groups of a content pattern map onto a date.
#[derive(Debug, Clone, Copy)]
enum Kind {
    /// `1 November 2021` / `1 Nov 2021` / `1. november 2021` (day, month-name, year)
    MonthName,
    /// `dd[./]mm[./]yyyy` (two-digit years expanded)
    DayMonthYear,
    /// `yyyy-mm-dd`
    IsoDate,
    /// `yyyymmdd` with optional `_hhmm`
    Compact8,
    /// `yymmdd`
    Compact6,
}

struct ContentPattern {
    regex: Regex,
    kind: Kind,
}

const MONTHS_EN_LONG: &str =
    "January|February|March|April|May|June|July|August|September|October|November|December";
const MONTHS_EN_ABBREV: &str = "Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec";
const MONTHS_NO: &str =
    "januar|februar|mars|april|mai|juni|juli|august|september|oktober|november|desember";

/// Optional trailing `HH:MM` time component shared by the textual patterns.
const OPT_TIME: &str = r"(?:\s+(\d{1,2}):(\d{2}))?";

/// The content pattern families, in precedence order.
static CONTENT_PATTERNS: LazyLock<Vec<ContentPattern>> = LazyLock::new(|| {
    let month_name = |names: &str| {
        format!(r"(?i)\b(\d{{1,2}})\.?\s+({names})\s+(\d{{4}})\b{OPT_TIME}")
    };
    vec![
        ContentPattern {
            regex: Regex::new(&month_name(MONTHS_EN_LONG)).expect("valid regex"),
            kind: Kind::MonthName,
        },
        ContentPattern {
            regex: Regex::new(&month_name(MONTHS_EN_ABBREV)).expect("valid regex"),
            kind: Kind::MonthName,
        },
        ContentPattern {
            regex: Regex::new(&month_name(MONTHS_NO)).expect("valid regex"),
            kind: Kind::MonthName,
        },
        ContentPattern {
            regex: Regex::new(&format!(
                r"\b(\d{{1,2}})[./](\d{{1,2}})[./](\d{{2,4}})\b{OPT_TIME}"
            ))
            .expect("valid regex"),
            kind: Kind::DayMonthYear,
        },
        ContentPattern {
            regex: Regex::new(&format!(r"\b(\d{{4}})-(\d{{1,2}})-(\d{{1,2}})\b{OPT_TIME}"))
                .expect("valid regex"),
            kind: Kind::IsoDate,
        },
        ContentPattern {
            regex: Regex::new(r"\b(\d{8})(?:_(\d{4}))?\b").expect("valid regex"),
            kind: Kind::Compact8,
        },
        ContentPattern {
            regex: Regex::new(r"\b(\d{6})\b").expect("valid regex"),
            kind: Kind::Compact6,
        },
    ]
});

/// Filename patterns carrying an explicit time component, tried first.
static FILENAME_TIME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(\d{8})_(\d{6})").expect("valid regex"), // yyyymmdd_hhmmss
        Regex::new(r"(\d{14})").expect("valid regex"),        // yyyymmddhhmmss
    ]
});

/// Date-only filename patterns; matches default to midnight.
///
/// Each entry is `(regex, strftime-style shape)` where the shape tells the
/// parser which group is which.
static FILENAME_DATE_PATTERNS: LazyLock<Vec<(Regex, DateShape)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("valid regex"), DateShape::Ymd),
        (Regex::new(r"(\d{4})(\d{2})(\d{2})").expect("valid regex"), DateShape::Ymd),
        (Regex::new(r"(\d{2})(\d{2})(\d{2})").expect("valid regex"), DateShape::YmdShort),
        (Regex::new(r"(\d{2})-(\d{2})-(\d{4})").expect("valid regex"), DateShape::Dmy),
        (Regex::new(r"(\d{2})(\d{2})(\d{4})").expect("valid regex"), DateShape::Dmy),
        (Regex::new(r"(\d{2})/(\d{2})/(\d{4})").expect("valid regex"), DateShape::Dmy),
        (Regex::new(r"(\d{2})\.(\d{2})\.(\d{4})").expect("valid regex"), DateShape::Dmy),
        (Regex::new(r"(\d{4})/(\d{2})/(\d{2})").expect("valid regex"), DateShape::Ymd),
        (Regex::new(r"(\d{4})\.(\d{2})\.(\d{2})").expect("valid regex"), DateShape::Ymd),
    ]
});

#[derive(Debug, Clone, Copy)]
enum DateShape {
    Ymd,
    YmdShort,
    Dmy,
}

/// Scan free text for a date, trying each pattern family in order.
///
/// Returns the first match that parses into a valid date; the scan stops
/// immediately on success.
pub fn scan_text(text: &str) -> Option<NaiveDateTime> {
    for pattern in CONTENT_PATTERNS.iter() {
        for caps in pattern.regex.captures_iter(text) {
            if let Some(dt) = parse_content_match(pattern.kind, &caps) {
                return Some(dt);
            }
        }
    }
    None
}

/// Scan a filename for a date: time-bearing patterns first, then date-only
/// patterns defaulting to midnight.
pub fn scan_filename(filename: &str) -> Option<NaiveDateTime> {
    for regex in FILENAME_TIME_PATTERNS.iter() {
        for caps in regex.captures_iter(filename) {
            let dt = if caps.len() == 3 {
                let date = caps.get(1)?.as_str();
                let time = caps.get(2)?.as_str();
                NaiveDateTime::parse_from_str(&format!("{date}_{time}"), "%Y%m%d_%H%M%S").ok()
            } else {
                NaiveDateTime::parse_from_str(caps.get(1)?.as_str(), "%Y%m%d%H%M%S").ok()
            };
            if dt.is_some() {
                return dt;
            }
        }
    }

    for (regex, shape) in FILENAME_DATE_PATTERNS.iter() {
        for caps in regex.captures_iter(filename) {
            let (g1, g2, g3) = (
                caps.get(1)?.as_str(),
                caps.get(2)?.as_str(),
                caps.get(3)?.as_str(),
            );
            let date = match shape {
                DateShape::Ymd => make_date(g1.parse().ok()?, g2.parse().ok()?, g3.parse().ok()?),
                DateShape::YmdShort => make_date(
                    expand_two_digit_year(g1.parse().ok()?),
                    g2.parse().ok()?,
                    g3.parse().ok()?,
                ),
                DateShape::Dmy => make_date(g3.parse().ok()?, g2.parse().ok()?, g1.parse().ok()?),
            };
            if let Some(date) = date {
                return Some(date.and_time(NaiveTime::MIN));
            }
        }
    }

    None
}

fn parse_content_match(kind: Kind, caps: &regex::Captures<'_>) -> Option<NaiveDateTime> {
    let date = match kind {
        Kind::MonthName => {
            let day: u32 = caps.get(1)?.as_str().parse().ok()?;
            let month = month_number(caps.get(2)?.as_str())?;
            let year: i32 = caps.get(3)?.as_str().parse().ok()?;
            make_date(year, month, day)?
        }
        Kind::DayMonthYear => {
            let day: u32 = caps.get(1)?.as_str().parse().ok()?;
            let month: u32 = caps.get(2)?.as_str().parse().ok()?;
            let year_raw = caps.get(3)?.as_str();
            let year: i32 = year_raw.parse().ok()?;
            let year = if year_raw.len() == 2 {
                expand_two_digit_year(year)
            } else {
                year
            };
            make_date(year, month, day)?
        }
        Kind::IsoDate => {
            let year: i32 = caps.get(1)?.as_str().parse().ok()?;
            let month: u32 = caps.get(2)?.as_str().parse().ok()?;
            let day: u32 = caps.get(3)?.as_str().parse().ok()?;
            make_date(year, month, day)?
        }
        Kind::Compact8 => {
            let digits = caps.get(1)?.as_str();
            let date = make_date(
                digits[0..4].parse().ok()?,
                digits[4..6].parse().ok()?,
                digits[6..8].parse().ok()?,
            )?;
            let time = match caps.get(2) {
                Some(t) => NaiveTime::parse_from_str(t.as_str(), "%H%M").ok()?,
                None => NaiveTime::MIN,
            };
            return Some(date.and_time(time));
        }
        Kind::Compact6 => {
            let digits = caps.get(1)?.as_str();
            let year = expand_two_digit_year(digits[0..2].parse().ok()?);
            let month: u32 = digits[2..4].parse().ok()?;
            let day: u32 = digits[4..6].parse().ok()?;
            make_date(year, month, day)?
        }
    };

    // Optional trailing HH:MM (textual patterns only; compact forms returned above)
    let time = match (caps.get(4), caps.get(5)) {
        (Some(h), Some(m)) => {
            NaiveTime::from_hms_opt(h.as_str().parse().ok()?, m.as_str().parse().ok()?, 0)?
        }
        _ => NaiveTime::MIN,
    };

    Some(date.and_time(time))
}

/// Reject calendar-impossible dates and wildly implausible years.
///
/// Personal email does not predate 1970; the upper bound guards against
/// phone numbers and order IDs that happen to look like compact dates.
fn make_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if !(1970..=2099).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Expand a two-digit year: 70–99 → 1970–1999, 00–69 → 2000–2069.
fn expand_two_digit_year(year: i32) -> i32 {
    if year >= 70 {
        1900 + year
    } else {
        2000 + year
    }
}

/// Month name (English long/abbreviated or Norwegian) to month number.
fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    let en_long = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    let en_abbrev = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let no = [
        "januar", "februar", "mars", "april", "mai", "juni", "juli", "august", "september",
        "oktober", "november", "desember",
    ];
    for table in [&en_long[..], &en_abbrev[..], &no[..]] {
        if let Some(pos) = table.iter().position(|&m| m == lower) {
            return Some(pos as u32 + 1);
        }
    }
    None
}
