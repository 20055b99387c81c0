use std::collections::HashMap;
use tracing::{debug, instrument};

use super::record::Record;
use super::value::Value;
use crate::config::TableConfig;
use crate::tokenize::{split_fields, split_lines};

/// Separator placed between key-field values in a composite key.
pub const KEY_SEPARATOR: &str = ".";

/// Output of one indexing pass.
#[derive(Debug, Clone, Default)]
pub struct Indexed {
    pub header: Vec<String>,
    /// Selected column names that matched the header, in request order.
    pub selected: Vec<String>,
    pub rows: HashMap<String, Record>,
}

/// Positions of `names` within `header`, in the order of `names`.
/// Names missing from the header are dropped.
pub fn resolve_indices<S: AsRef<str>>(header: &[String], names: &[S]) -> Vec<usize> {
    names
        .iter()
        .filter_map(|n| header.iter().position(|h| h == n.as_ref()))
        .collect()
}

/// Tokenize `text` and build the key → record map.
/// Returns `None` when there is no header line.
#[instrument(level = "debug", skip(text, config), fields(bytes = text.len()))]
pub fn build_index(text: &str, config: &TableConfig) -> Option<Indexed> {
    let lines = split_lines(text, &config.line_delimiter);
    let (first, data) = lines.split_first()?;
    let header = split_fields(first, &config.delimiter);

    let selected_names: Vec<String> = config
        .selected_columns
        .clone()
        .unwrap_or_else(|| header.clone());
    let key_names: Vec<String> = match &config.key_columns {
        Some(k) => k.clone(),
        None => header.first().cloned().into_iter().collect(),
    };

    let numeric_idx = resolve_indices(&header, &config.numeric_columns);
    let key_idx = resolve_indices(&header, &key_names);
    let selected_idx = resolve_indices(&header, &selected_names);

    let dropped: Vec<&String> = key_names
        .iter()
        .chain(&selected_names)
        .chain(&config.numeric_columns)
        .filter(|n| !header.contains(*n))
        .collect();
    if !dropped.is_empty() {
        debug!(?dropped, "column names not in header");
    }

    let mut rows: HashMap<String, Record> = HashMap::with_capacity(data.len());
    let mut short_rows = 0usize;
    let mut overwritten = 0usize;

    for line in data {
        let mut values: Vec<Value> = split_fields(line, &config.delimiter)
            .into_iter()
            .map(Value::Text)
            .collect();
        if values.len() < header.len() {
            short_rows += 1;
        }

        for &p in &numeric_idx {
            if let Some(Value::Text(raw)) = values.get(p) {
                let parsed = Value::parse_number(raw);
                values[p] = parsed;
            }
        }

        let key = key_idx
            .iter()
            .map(|&p| values.get(p).map(Value::to_string).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(KEY_SEPARATOR);

        let record: Record = selected_idx
            .iter()
            .map(|&p| {
                let value = values.get(p).cloned().unwrap_or(Value::Absent);
                (header[p].clone(), value)
            })
            .collect();

        if rows.insert(key, record).is_some() {
            overwritten += 1;
        }
    }

    debug!(
        lines = lines.len(),
        keys = rows.len(),
        short_rows,
        overwritten,
        "indexed"
    );

    let selected = selected_idx.iter().map(|&p| header[p].clone()).collect();
    Some(Indexed {
        header,
        selected,
        rows,
    })
}
