use serde::{Deserialize, Deserializer, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{CsvDictError, PathError, Result};
use crate::tokenize::{DEFAULT_FIELD_DELIMITER, DEFAULT_LINE_DELIMITER};

/// Construction parameters for a [`CsvDict`](crate::CsvDict).
///
/// Only `csv_path` is required. Column lists accept either a single name or a
/// list of names when deserialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSpec {
    /// `None` when the field was never given, `Some(None)` when it was null.
    #[serde(
        alias = "csvPath",
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub csv_path: Option<Option<String>>,
    #[serde(alias = "tblName")]
    pub tbl_name: Option<String>,
    #[serde(alias = "tblDescr")]
    pub tbl_descr: Option<String>,
    pub delim: Option<String>,
    #[serde(alias = "lineDelim")]
    pub line_delim: Option<String>,
    #[serde(alias = "keyFields", deserialize_with = "one_or_many")]
    pub key_fields: Option<Vec<String>>,
    #[serde(alias = "selFields", deserialize_with = "one_or_many")]
    pub sel_fields: Option<Vec<String>>,
    #[serde(alias = "numFields", deserialize_with = "one_or_many")]
    pub num_fields: Option<Vec<String>>,
}

fn present<'de, D>(d: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(d).map(Some)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

fn one_or_many<'de, D>(d: D) -> std::result::Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<OneOrMany>::deserialize(d)?.map(|v| match v {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    }))
}

fn names<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl TableSpec {
    pub fn new(csv_path: impl Into<String>) -> Self {
        Self {
            csv_path: Some(Some(csv_path.into())),
            ..Self::default()
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.tbl_name = Some(name.into());
        self
    }

    pub fn description(mut self, descr: impl Into<String>) -> Self {
        self.tbl_descr = Some(descr.into());
        self
    }

    pub fn delimiter(mut self, delim: impl Into<String>) -> Self {
        self.delim = Some(delim.into());
        self
    }

    pub fn line_delimiter(mut self, delim: impl Into<String>) -> Self {
        self.line_delim = Some(delim.into());
        self
    }

    pub fn key_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_fields = Some(names(fields));
        self
    }

    pub fn selected_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sel_fields = Some(names(fields));
        self
    }

    pub fn numeric_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.num_fields = Some(names(fields));
        self
    }

    /// Load a spec from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| CsvDictError::Config(format!("reading {}: {}", path.display(), e)))?;
        let is_json = path
            .extension()
            .and_then(|s| s.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&text)
                .map_err(|e| CsvDictError::Config(format!("parsing {}: {}", path.display(), e)))
        } else {
            serde_yaml::from_str(&text)
                .map_err(|e| CsvDictError::Config(format!("parsing {}: {}", path.display(), e)))
        }
    }

    /// Check the path before any I/O happens.
    pub fn validate_path(&self) -> std::result::Result<PathBuf, PathError> {
        match &self.csv_path {
            None => Err(PathError::Missing),
            Some(None) => Err(PathError::Invalid {
                value: "null".into(),
            }),
            Some(Some(p)) if p.is_empty() => Err(PathError::Invalid { value: p.clone() }),
            Some(Some(p)) => Ok(PathBuf::from(p)),
        }
    }

    /// Explicit `tbl_name`, else the base name of the file.
    pub fn table_name(&self, path: &Path) -> String {
        if let Some(name) = self.tbl_name.as_ref().filter(|n| !n.is_empty()) {
            return name.clone();
        }
        path.file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    }

    pub fn table_config(&self) -> TableConfig {
        let or_default = |v: &Option<String>, default: &str| {
            v.as_ref()
                .filter(|d| !d.is_empty())
                .cloned()
                .unwrap_or_else(|| default.to_string())
        };
        TableConfig {
            delimiter: or_default(&self.delim, DEFAULT_FIELD_DELIMITER),
            line_delimiter: or_default(&self.line_delim, DEFAULT_LINE_DELIMITER),
            key_columns: self.key_fields.clone(),
            selected_columns: self.sel_fields.clone(),
            numeric_columns: self.num_fields.clone().unwrap_or_default(),
        }
    }
}

/// Parse parameters for one table. `None` column lists fall back to the
/// header: first column for keys, every column for the selection.
#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    pub delimiter: String,
    pub line_delimiter: String,
    pub key_columns: Option<Vec<String>>,
    pub selected_columns: Option<Vec<String>>,
    pub numeric_columns: Vec<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            delimiter: DEFAULT_FIELD_DELIMITER.to_string(),
            line_delimiter: DEFAULT_LINE_DELIMITER.to_string(),
            key_columns: None,
            selected_columns: None,
            numeric_columns: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn missing_and_null_paths_are_distinguished() {
        let absent: TableSpec = serde_json::from_str(r#"{"tbl_name": "x"}"#).unwrap();
        assert!(matches!(absent.validate_path(), Err(PathError::Missing)));

        let null: TableSpec = serde_json::from_str(r#"{"csvPath": null}"#).unwrap();
        assert!(matches!(
            null.validate_path(),
            Err(PathError::Invalid { ref value }) if value == "null"
        ));

        let empty = TableSpec::new("");
        assert!(matches!(
            empty.validate_path(),
            Err(PathError::Invalid { .. })
        ));

        assert!(matches!(TableSpec::default().validate_path(), Err(PathError::Missing)));
    }

    #[test]
    fn table_name_defaults_to_base_name() {
        let spec = TableSpec::new("data/gtfs/stops.txt");
        let path = spec.validate_path().unwrap();
        assert_eq!(spec.table_name(&path), "stops.txt");
        assert_eq!(spec.clone().name("Stops").table_name(&path), "Stops");
    }

    #[test]
    fn config_defaults() {
        let cfg = TableSpec::new("a.csv").table_config();
        assert_eq!(cfg, TableConfig::default());
        assert_eq!(cfg.delimiter, ",");
        assert_eq!(cfg.line_delimiter, "\n");

        let cfg = TableSpec::new("a.csv").delimiter("").table_config();
        assert_eq!(cfg.delimiter, ",");
    }

    #[test]
    fn yaml_spec_accepts_single_names() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile()?;
        writeln!(
            file,
            "csv_path: tests/stops.txt\ntbl_name: Stops\nkey_fields: stop_id\nsel_fields: [stop_name, zone_id]\ndelim: \";\""
        )?;
        let spec = TableSpec::from_file(file.path())?;
        assert_eq!(spec.key_fields, Some(vec!["stop_id".to_string()]));
        assert_eq!(
            spec.sel_fields,
            Some(vec!["stop_name".to_string(), "zone_id".to_string()])
        );
        assert_eq!(spec.table_config().delimiter, ";");
        Ok(())
    }

    #[test]
    fn json_spec_uses_camel_case_aliases() -> Result<()> {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile()?;
        write!(
            file,
            r#"{{"csvPath": "s.csv", "tblDescr": "Train stops", "keyFields": ["a", "b"], "numFields": "lat"}}"#
        )?;
        let spec = TableSpec::from_file(file.path())?;
        assert_eq!(spec.validate_path().unwrap(), PathBuf::from("s.csv"));
        assert_eq!(spec.tbl_descr.as_deref(), Some("Train stops"));
        assert_eq!(spec.table_config().numeric_columns, vec!["lat"]);
        Ok(())
    }

    #[test]
    fn unreadable_spec_is_a_config_error() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(file, "key_fields: [unterminated")?;
        assert!(matches!(
            TableSpec::from_file(file.path()),
            Err(CsvDictError::Config(_))
        ));
        Ok(())
    }
}
