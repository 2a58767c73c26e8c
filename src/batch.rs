use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{Error, Result};

/// Reserved batch keys carrying page metadata rather than records.
pub const DATE_KEY: &str = "date";
pub const CITY_KEY: &str = "pd_city";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrestRecord {
    pub name: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ArrestDetails>,
}

/// Sub-fields derived by the detailed grammar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArrestDetails {
    pub age: Option<u32>,
    pub address: String,
    pub charges: Vec<Charge>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Serialized as `[count, description]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge(pub u32, pub String);

impl Charge {
    pub fn count(&self) -> u32 {
        self.0
    }

    pub fn description(&self) -> &str {
        &self.1
    }
}

/// Records found on one blotter page, keyed by discovery index.
///
/// Indices are incidental: records dropped during splitting leave gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub records: BTreeMap<usize, ArrestRecord>,
    pub date: Option<String>,
    pub pd_city: Option<String>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&usize, &ArrestRecord)> {
        self.records.iter()
    }

    /// Object keyed by stringified index, plus the reserved keys when set.
    pub fn to_json(&self) -> Result<Value> {
        let mut map = Map::new();
        for (index, record) in &self.records {
            map.insert(index.to_string(), serde_json::to_value(record)?);
        }
        if let Some(date) = &self.date {
            map.insert(DATE_KEY.to_string(), Value::String(date.clone()));
        }
        if let Some(city) = &self.pd_city {
            map.insert(CITY_KEY.to_string(), Value::String(city.clone()));
        }
        Ok(Value::Object(map))
    }

    pub fn from_json(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::InvalidRecord(
                "a batch must be a JSON object".to_string(),
            ));
        };

        let mut batch = Batch::default();
        for (key, value) in map {
            match key.as_str() {
                DATE_KEY => batch.date = value.as_str().map(str::to_string),
                CITY_KEY => batch.pd_city = value.as_str().map(str::to_string),
                _ => match key.parse::<usize>() {
                    Ok(index) => {
                        let record: ArrestRecord = serde_json::from_value(value)?;
                        batch.records.insert(index, record);
                    }
                    Err(_) => warn!(key = %key, "skipping unknown batch key"),
                },
            }
        }
        Ok(batch)
    }
}

// ── Tests ──
