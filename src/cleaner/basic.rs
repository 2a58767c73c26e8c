use tracing::debug;

use crate::batch::{ArrestRecord, Batch};

/// Keep fragments whose text before the first ", " is all caps.
///
/// This is the blotter convention for an arrestee's name. Page banners such
/// as "POLICE BLOTTER" pass as well; they are dropped later for lacking a
/// comma, unless they happen to contain one.
pub fn get_arrests<S: AsRef<str>>(fragments: &[S]) -> Vec<&str> {
    fragments
        .iter()
        .map(AsRef::as_ref)
        .filter(|phrase| {
            let lead = phrase.split(", ").next().unwrap_or_default();
            is_upper(lead)
        })
        .collect()
}

pub fn clean<S: AsRef<str>>(fragments: &[S]) -> Batch {
    let mut batch = Batch::default();
    for (index, phrase) in get_arrests(fragments).into_iter().enumerate() {
        match split_record(phrase) {
            Some(record) => {
                batch.records.insert(index, record);
            }
            None => debug!(index, phrase, "dropping fragment without name/content split"),
        }
    }
    batch
}

/// Split on the first ", " into name and content; both must be non-empty.
pub(crate) fn split_record(phrase: &str) -> Option<ArrestRecord> {
    let (name, content) = phrase.split_once(", ")?;
    if name.trim().is_empty() || content.trim().is_empty() {
        return None;
    }
    Some(ArrestRecord {
        name: name.to_string(),
        content: content.to_string(),
        details: None,
    })
}

/// True when `s` has at least one cased character and none are lowercase.
pub(crate) fn is_upper(s: &str) -> bool {
    let mut cased = false;
    for c in s.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            cased = true;
        }
    }
    cased
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_fragment_yields_nothing() {
        assert!(clean(&[""]).is_empty());
        assert!(clean::<&str>(&[]).is_empty());
    }

    #[test]
    fn malformed_middle_fragment_skipped() {
        let batch = clean(&[
            "JOHN SMITH, stole a car",
            "not a record",
            "JANE DOE, public intoxication",
        ]);
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.records[&0].name, "JOHN SMITH");
        assert_eq!(batch.records[&0].content, "stole a car");
        assert_eq!(batch.records[&1].name, "JANE DOE");
        assert_eq!(batch.records[&1].content, "public intoxication");
    }

    #[test]
    fn split_on_first_comma_only() {
        let fragments = [
            "",
            "POLICE BLOTTER",
            "SMITH, JOHN, 34, 12 Main St, Hartford, CT, one count of larceny",
        ];
        let batch = clean(&fragments);
        assert_eq!(batch.len(), 1);
        let (index, record) = batch.iter().next().unwrap();
        // "POLICE BLOTTER" was retained then dropped, leaving a gap at 0.
        assert_eq!(*index, 1);
        assert_eq!(record.name, "SMITH");
        assert_eq!(
            record.content,
            "JOHN, 34, 12 Main St, Hartford, CT, one count of larceny"
        );
    }

    #[test]
    fn name_and_content_rebuild_fragment() {
        let fragments = [
            "DOE, JANE, 22, of Waterbury, breach of peace",
            "Lowercase lead, ignored",
            "ROE, RICHARD, 40, interfering",
        ];
        for (_, record) in clean(&fragments).iter() {
            assert!(!record.name.is_empty());
            assert!(!record.content.is_empty());
            let rebuilt = format!("{}, {}", record.name, record.content);
            assert!(fragments.contains(&rebuilt.as_str()));
        }
    }

    #[test]
    fn empty_content_dropped() {
        assert!(clean(&["SMITH, "]).is_empty());
    }

    #[test]
    fn banner_with_comma_is_known_false_positive() {
        let batch = clean(&["POLICE BLOTTER, compiled from reports"]);
        assert_eq!(batch.len(), 1);
        assert_eq!(batch.records[&0].name, "POLICE BLOTTER");
    }

    #[test]
    fn upper_heuristic() {
        assert!(is_upper("O'NEIL"));
        assert!(is_upper("JOHN SMITH JR."));
        assert!(!is_upper("John"));
        assert!(!is_upper("123"));
        assert!(!is_upper(""));
    }
}
