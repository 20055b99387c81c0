use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::{runtime::Handle, sync::watch, time::Instant};
use tracing::{debug, error, info, instrument};

use crate::config::{TableConfig, TableSpec};
use crate::error::{CsvDictError, PathError, Result};
use crate::table::Table;

/// Progress of a [`CsvDict`] load. Leaves `Pending` exactly once.
#[derive(Debug, Clone)]
pub enum LoadState {
    Pending,
    Loaded(Arc<Table>),
    Failed(CsvDictError),
}

impl LoadState {
    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Pending)
    }
}

/// A CSV file loaded in the background into a key → record [`Table`].
pub struct CsvDict {
    name: String,
    description: Option<String>,
    path: PathBuf,
    state: watch::Receiver<LoadState>,
}

impl CsvDict {
    /// Validate `spec` and start reading the file on the current tokio runtime.
    ///
    /// Path problems that can be seen without touching the filesystem are
    /// returned here, as is a call made outside a tokio runtime. Read and
    /// parse failures arrive through [`CsvDict::loaded`].
    pub fn open(spec: TableSpec) -> Result<Self> {
        let path = spec.validate_path().map_err(|e| {
            error!(error = %e, "rejecting table spec");
            CsvDictError::from(e)
        })?;
        let runtime = Handle::try_current()
            .map_err(|e| CsvDictError::Task(format!("no tokio runtime: {e}")))?;
        let name = spec.table_name(&path);
        let description = spec.tbl_descr.clone();
        let config = spec.table_config();

        let (tx, rx) = watch::channel(LoadState::Pending);
        runtime.spawn(load(
            name.clone(),
            description.clone(),
            path.clone(),
            config,
            tx,
        ));

        Ok(Self {
            name,
            description,
            path,
            state: rx,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    /// The table, or `None` while the load is pending or after it failed.
    pub fn table(&self) -> Option<Arc<Table>> {
        match &*self.state.borrow() {
            LoadState::Loaded(table) => Some(Arc::clone(table)),
            _ => None,
        }
    }

    /// Watch the load; the value changes once, from `Pending` to its outcome.
    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.clone()
    }

    /// Wait for the load to finish.
    pub async fn loaded(&self) -> Result<Arc<Table>> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| !s.is_pending())
            .await
            .map_err(|_| CsvDictError::Task("loader exited before publishing".into()))?;
        match &*state {
            LoadState::Loaded(table) => Ok(Arc::clone(table)),
            LoadState::Failed(e) => Err(e.clone()),
            LoadState::Pending => Err(CsvDictError::Task("load still pending".into())),
        }
    }
}

/// Open `spec` and wait for the table.
pub async fn load_table(spec: TableSpec) -> Result<Arc<Table>> {
    CsvDict::open(spec)?.loaded().await
}

#[instrument(level = "info", skip(description, path, config, tx), fields(path = %path.display()))]
async fn load(
    name: String,
    description: Option<String>,
    path: PathBuf,
    config: TableConfig,
    tx: watch::Sender<LoadState>,
) {
    let start = Instant::now();
    let state = match read_and_index(&name, description, &path, config).await {
        Ok(table) => {
            info!(table = %name, keys = table.len(), elapsed = ?start.elapsed(), "table loaded");
            LoadState::Loaded(Arc::new(table))
        }
        Err(e) => {
            error!(table = %name, error = %e, "table load failed");
            LoadState::Failed(e)
        }
    };
    if tx.send(state).is_err() {
        debug!(table = %name, "no one waiting on load");
    }
}

async fn read_and_index(
    name: &str,
    description: Option<String>,
    path: &Path,
    config: TableConfig,
) -> Result<Table> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| PathError::from_io(path, e))?;
    debug!(bytes = bytes.len(), "read file");

    // index on the blocking pool
    let name = name.to_string();
    let table = tokio::task::spawn_blocking(move || Table::from_bytes(name, &bytes, &config))
        .await
        .map_err(|e| CsvDictError::Task(e.to_string()))??;
    Ok(table.with_description(description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{Selection, Value};
    use anyhow::Result;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};
    use tracing_subscriber::{fmt, EnvFilter};

    fn init_logging() {
        let _ = fmt()
            .with_env_filter(EnvFilter::new("debug"))
            .with_test_writer()
            .try_init();
    }

    const STOPS: &str = "stop_id,stop_code,stop_name,stop_lat,stop_lon,zone_id
70011,,\"San Francisco Caltrain\",37.77639,-122.394992,1
70012,,\"San Francisco Caltrain\",37.776348,-122.394935,1
70021,,\"22nd St Caltrain\",37.757599,-122.39188,1
";

    fn stops_file() -> Result<NamedTempFile> {
        let mut tmp = tempfile::Builder::new().suffix("_stops.txt").tempfile()?;
        tmp.write_all(STOPS.as_bytes())?;
        Ok(tmp)
    }

    #[test]
    fn missing_path_fails_before_io() {
        let err = CsvDict::open(TableSpec::default()).err().unwrap();
        assert!(matches!(err, CsvDictError::Path(PathError::Missing)));

        let mut spec = TableSpec::default();
        spec.csv_path = Some(None);
        let err = CsvDict::open(spec).err().unwrap();
        assert!(matches!(err, CsvDictError::Path(PathError::Invalid { .. })));
    }

    #[test]
    fn open_outside_runtime_is_an_error() -> Result<()> {
        let tmp = stops_file()?;
        let err = CsvDict::open(TableSpec::new(tmp.path().to_string_lossy()))
            .err()
            .unwrap();
        assert!(matches!(err, CsvDictError::Task(ref msg) if msg.contains("no tokio runtime")));
        Ok(())
    }

    #[tokio::test]
    async fn loads_stops_file() -> Result<()> {
        init_logging();
        let tmp = stops_file()?;
        let spec = TableSpec::new(tmp.path().to_string_lossy())
            .name("Stops")
            .description("Train stops")
            .key_fields(["stop_id"])
            .numeric_fields(["stop_lat", "stop_lon"]);

        let dict = CsvDict::open(spec)?;
        assert_eq!(dict.name(), "Stops");
        let table = dict.loaded().await?;

        assert_eq!(table.name(), "Stops");
        assert_eq!(table.description(), Some("Train stops"));
        assert_eq!(table.len(), 3);
        let rows = table.values_for_keys("70021", vec!["stop_name", "stop_lat", "zone_id"]);
        assert_eq!(
            rows,
            vec![vec![
                Value::text("70021"),
                Value::text("22nd St Caltrain"),
                Value::Number(37.757599),
                Value::text("1"),
            ]]
        );
        Ok(())
    }

    #[tokio::test]
    async fn name_defaults_to_file_name() -> Result<()> {
        let tmp = stops_file()?;
        let expected = tmp
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        let table = load_table(TableSpec::new(tmp.path().to_string_lossy())).await?;
        assert_eq!(table.name(), expected);
        assert_eq!(table.selected_columns().len(), 6);
        Ok(())
    }

    #[tokio::test]
    async fn table_is_unavailable_until_loaded() -> Result<()> {
        let tmp = stops_file()?;
        let dict = CsvDict::open(TableSpec::new(tmp.path().to_string_lossy()))?;
        // current-thread runtime: the load task has not run yet
        assert!(dict.table().is_none());
        assert!(dict.state().is_pending());

        dict.loaded().await?;
        assert_eq!(dict.table().map(|t| t.len()), Some(3));
        Ok(())
    }

    #[tokio::test]
    async fn completion_fires_exactly_once() -> Result<()> {
        let tmp = stops_file()?;
        let dict = CsvDict::open(TableSpec::new(tmp.path().to_string_lossy()))?;
        let mut rx = dict.subscribe();

        rx.changed().await?;
        assert!(matches!(&*rx.borrow_and_update(), LoadState::Loaded(_)));
        // sender is gone once the single update has been published
        assert!(rx.changed().await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn nonexistent_file_reports_not_found() -> Result<()> {
        init_logging();
        let dir = tempdir()?;
        let missing = dir.path().join("nope.csv");
        let dict = CsvDict::open(TableSpec::new(missing.to_string_lossy()))?;

        let err = dict.loaded().await.unwrap_err();
        assert!(matches!(err, CsvDictError::Path(PathError::NotFound { .. })));
        assert!(dict.table().is_none());
        assert!(matches!(dict.state(), LoadState::Failed(_)));
        assert_eq!(dict.name(), "nope.csv");
        Ok(())
    }

    #[tokio::test]
    async fn directory_is_unreadable() -> Result<()> {
        let dir = tempdir()?;
        let err = load_table(TableSpec::new(dir.path().to_string_lossy()))
            .await
            .unwrap_err();
        assert!(matches!(err, CsvDictError::Path(PathError::Unreadable { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn empty_file_has_no_header() -> Result<()> {
        let tmp = NamedTempFile::new()?;
        let err = load_table(TableSpec::new(tmp.path().to_string_lossy()).name("blank"))
            .await
            .unwrap_err();
        assert!(matches!(err, CsvDictError::MissingHeader { ref table } if table == "blank"));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_readers_share_the_table() -> Result<()> {
        let tmp = stops_file()?;
        let table = load_table(TableSpec::new(tmp.path().to_string_lossy())).await?;

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let table = Arc::clone(&table);
                tokio::spawn(async move { table.values(Selection::All).len() })
            })
            .collect();
        for h in handles {
            assert_eq!(h.await?, 3);
        }
        Ok(())
    }
}
