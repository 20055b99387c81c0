pub mod index;
pub mod record;
pub mod value;

pub use index::{build_index, resolve_indices, Indexed, KEY_SEPARATOR};
pub use record::Record;
pub use value::Value;

use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashMap};

use crate::config::TableConfig;
use crate::error::{CsvDictError, Result};

/// Which keys or fields a lookup should cover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Only(Vec<String>),
}

impl From<&str> for Selection {
    fn from(s: &str) -> Self {
        Selection::Only(vec![s.to_string()])
    }
}

impl From<String> for Selection {
    fn from(s: String) -> Self {
        Selection::Only(vec![s])
    }
}

impl From<Vec<String>> for Selection {
    fn from(v: Vec<String>) -> Self {
        Selection::Only(v)
    }
}

impl From<Vec<&str>> for Selection {
    fn from(v: Vec<&str>) -> Self {
        Selection::Only(v.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Selection {
    fn from(v: &[&str]) -> Self {
        Selection::Only(v.iter().map(|s| s.to_string()).collect())
    }
}

impl<T: Into<Selection>> From<Option<T>> for Selection {
    fn from(v: Option<T>) -> Self {
        v.map_or(Selection::All, Into::into)
    }
}

/// A fully loaded key → record table. Immutable once built.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    description: Option<String>,
    header: Vec<String>,
    selected: Vec<String>,
    rows: HashMap<String, Record>,
}

impl Table {
    /// Index `text` under `config`. Fails only when there is no header line.
    pub fn from_text(name: impl Into<String>, text: &str, config: &TableConfig) -> Result<Self> {
        let name = name.into();
        let Indexed {
            header,
            selected,
            rows,
        } = build_index(text, config).ok_or_else(|| CsvDictError::MissingHeader {
            table: name.clone(),
        })?;
        Ok(Self {
            name,
            description: None,
            header,
            selected,
            rows,
        })
    }

    /// Like [`Table::from_text`], decoding `bytes` as lossy UTF-8.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8], config: &TableConfig) -> Result<Self> {
        Self::from_text(name, &String::from_utf8_lossy(bytes), config)
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Selected column names that matched the header.
    pub fn selected_columns(&self) -> &[String] {
        &self.selected
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every composite key. Order is unspecified.
    pub fn keys(&self) -> Vec<String> {
        self.rows.keys().cloned().collect()
    }

    pub fn get(&self, key: &str) -> Option<&Record> {
        self.rows.get(key)
    }

    /// One row `[key, field_1, field_2, ...]` per requested key present in
    /// the table. Unknown keys are skipped; missing or absent fields read as
    /// empty text.
    pub fn values_for_keys(
        &self,
        keys: impl Into<Selection>,
        fields: impl Into<Selection>,
    ) -> Vec<Vec<Value>> {
        let fields = match fields.into() {
            Selection::All => self.selected.clone(),
            Selection::Only(f) => f,
        };
        let row = |key: &str, record: &Record| {
            let mut out = Vec::with_capacity(fields.len() + 1);
            out.push(Value::text(key));
            for f in &fields {
                out.push(match record.get(f) {
                    Some(v) if !v.is_absent() => v.clone(),
                    _ => Value::text(""),
                });
            }
            out
        };

        match keys.into() {
            Selection::All => self.rows.iter().map(|(k, r)| row(k.as_str(), r)).collect(),
            Selection::Only(keys) => keys
                .iter()
                .filter_map(|k| self.rows.get(k).map(|r| row(k.as_str(), r)))
                .collect(),
        }
    }

    /// [`Table::values_for_keys`] over every key.
    pub fn values(&self, fields: impl Into<Selection>) -> Vec<Vec<Value>> {
        self.values_for_keys(Selection::All, fields)
    }
}

/// Serializes the key → record data, keys sorted and each record's columns
/// in selection order.
impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let sorted: BTreeMap<&String, &Record> = self.rows.iter().collect();
        sorted.serialize(serializer)
    }
}
