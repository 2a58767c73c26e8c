use chrono::NaiveDate;
use tracing::debug;

/// Stored when a posting date cannot be parsed.
pub const SENTINEL: &str = "0000-00-00";

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Turn a written date ("March 27, 2020") into the stored form ("2020-3-27").
///
/// Only full month names and cardinal days are understood; "March 27th, 2020"
/// or "Mar. 27, 2020" yield [`SENTINEL`]. Month is not zero-padded and the day
/// is kept as written.
pub fn normalize(natural: &str) -> String {
    match parse(natural.trim()) {
        Some(date) => date,
        None => {
            debug!(input = natural, "date did not parse, using sentinel");
            SENTINEL.to_string()
        }
    }
}

fn parse(natural: &str) -> Option<String> {
    let (head, year) = natural.rsplit_once(", ")?;
    // Anything before another ", " (e.g. a weekday) breaks the grammar.
    if head.contains(", ") {
        return None;
    }

    let mut words = head.split_whitespace();
    let (month_name, day) = (words.next()?, words.next()?);
    if words.next().is_some() {
        return None;
    }

    let month = MONTHS.iter().position(|m| *m == month_name)? as u32 + 1;
    if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !day.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // Reject impossible calendar dates such as "February 30".
    NaiveDate::from_ymd_opt(year.parse().ok()?, month, day.parse().ok()?)?;

    Some(format!("{}-{}-{}", year, month, day))
}

/// Render a calendar date in the written form [`normalize`] accepts.
pub fn to_natural(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

// ── Tests ──
