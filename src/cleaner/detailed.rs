//! Richer blotter grammar: age, address, charges and arrest dates.
//!
//! The token heuristics are order-dependent and only hold for the
//! "NAME, age, of street, City, two counts of X, Y" phrasing. Records that
//! do not fit keep their name and content with `details` left empty.

use tracing::debug;

use super::basic::split_record;
use super::vocab::{cardinal, is_month_abbrev, is_state};
use crate::batch::{ArrestDetails, Batch, Charge};

const DATE_MARKER: &str = "Date_posted";
const END_MARKER: &str = "Logged in as";

/// Legacy marker filter. Also fills the batch date and city from the page.
pub fn get_arrests<'a, S: AsRef<str>>(fragments: &'a [S], batch: &mut Batch) -> Vec<&'a str> {
    let mut arrests = Vec::new();
    for phrase in fragments.iter().map(AsRef::as_ref) {
        if phrase.is_empty() {
            continue;
        }
        if let Some(date) = phrase.strip_prefix(DATE_MARKER) {
            batch.date = Some(date.trim_start_matches(':').trim().to_string());
            continue;
        }
        if phrase.starts_with(END_MARKER) {
            break;
        }
        // "Torrington police reported..." labels the department.
        if phrase.chars().nth(1).is_some_and(char::is_lowercase) {
            if let Some(city) = phrase.split_whitespace().next() {
                batch.pd_city = Some(city.to_string());
            }
            continue;
        }
        if !phrase.contains(',') {
            continue;
        }
        arrests.push(phrase);
    }
    arrests
}

pub fn clean<S: AsRef<str>>(fragments: &[S]) -> Batch {
    let mut batch = Batch::default();
    let arrests = get_arrests(fragments, &mut batch);
    for (index, phrase) in arrests.into_iter().enumerate() {
        let Some(mut record) = split_record(phrase) else {
            debug!(index, phrase, "dropping fragment without name/content split");
            continue;
        };
        record.details = parse_details(&record.content);
        if record.details.is_none() {
            debug!(index, phrase, "no details derived, keeping name and content only");
        }
        batch.records.insert(index, record);
    }
    batch
}

pub fn parse_details(content: &str) -> Option<ArrestDetails> {
    let mut parts = content.splitn(3, ", ");
    let age = parts.next()?.trim().parse().ok();
    let mut address = trim_fragment(parts.next()?);
    let rest = parts.next().unwrap_or_default();

    let mut items = rest
        .split(", ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .peekable();

    // Town of residence follows the street.
    if let Some(town) = items.next_if(|s| s.starts_with(char::is_uppercase)) {
        address = format!("{}, {}", address, trim_fragment(town));
    }

    let mut details = ArrestDetails {
        age,
        address,
        ..Default::default()
    };

    for item in items {
        let tokens: Vec<&str> = item.split_whitespace().collect();
        let Some(first) = tokens.first().copied() else {
            continue;
        };

        if let Some(charge) = counted_charge(&tokens) {
            details.charges.push(charge);
        } else if is_month_abbrev(first) {
            let pieces: Vec<&str> = item.split(". ").collect();
            let split = pieces.len().min(2);
            details.date = Some(pieces[..split].join(" "));
            if pieces.len() > 2 {
                details.notes = Some(pieces[2..].join(". "));
            }
        } else if is_state(first) {
            details.address = format!("{}, {}", details.address, first);
        } else {
            let description = trim_fragment(item);
            if !description.is_empty() {
                details.charges.push(Charge(1, description));
            }
        }
    }

    Some(details)
}

/// "two counts of larceny", "larceny (two counts)", "three forgery".
fn counted_charge(tokens: &[&str]) -> Option<Charge> {
    let cleaned: Vec<String> = tokens
        .iter()
        .map(|t| trim_token(t).to_lowercase())
        .collect();

    let count_at = cleaned
        .iter()
        .position(|t| t == "count" || t == "counts")
        .filter(|&p| p > 0 && cardinal(&cleaned[p - 1]).is_some());

    let (count, kept): (u32, Vec<&str>) = match count_at {
        Some(p) => {
            let count = cardinal(&cleaned[p - 1])?;
            let skip_of = cleaned.get(p + 1).is_some_and(|t| t == "of");
            let kept = tokens
                .iter()
                .enumerate()
                .filter(|(i, _)| *i + 1 != p && *i != p && !(skip_of && *i == p + 1))
                .map(|(_, t)| *t)
                .collect();
            (count, kept)
        }
        None if tokens.len() > 1 => {
            let count = cardinal(&cleaned[0])?;
            (count, tokens[1..].to_vec())
        }
        None => return None,
    };

    let description = trim_fragment(&kept.join(" "));
    if description.is_empty() {
        return None;
    }
    Some(Charge(count, description))
}

fn trim_token(token: &str) -> &str {
    token.trim_matches(|c| matches!(c, '(' | ')' | '.' | ','))
}

/// Strip a leading "of ", then surrounding periods and parentheses.
pub(crate) fn trim_fragment(text: &str) -> String {
    let text = text.trim();
    let text = text.strip_prefix("of ").unwrap_or(text);
    text.trim_matches('.')
        .trim_matches(|c| c == '(' || c == ')')
        .trim()
        .to_string()
}

// ── Tests ──
