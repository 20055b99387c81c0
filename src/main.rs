use anyhow::{Context, Result};
use clap::Parser;
use csvdict::{CsvDict, Selection, TableSpec, Value};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

/// Load a CSV file into a keyed table and report its contents.
#[derive(Parser, Debug)]
struct Args {
    /// CSV file to load
    csv_path: Option<String>,

    /// JSON or YAML table spec; other flags override it
    #[arg(long)]
    spec: Option<PathBuf>,

    /// Table name (defaults to the file name)
    #[arg(long)]
    name: Option<String>,

    /// Table description
    #[arg(long)]
    descr: Option<String>,

    /// Field delimiter
    #[arg(long)]
    delim: Option<String>,

    /// Key columns, joined with '.' into the row key
    #[arg(long, value_delimiter = ',')]
    key: Option<Vec<String>>,

    /// Columns kept in each record
    #[arg(long, value_delimiter = ',')]
    select: Option<Vec<String>>,

    /// Columns coerced to numbers
    #[arg(long, value_delimiter = ',')]
    numeric: Option<Vec<String>>,

    /// Keys to print rows for
    #[arg(long, value_delimiter = ',')]
    lookup: Option<Vec<String>>,

    /// Fields to print for each looked-up row
    #[arg(long, value_delimiter = ',')]
    fields: Option<Vec<String>>,
}

fn trimmed(v: Vec<String>) -> Vec<String> {
    v.into_iter().map(|s| s.trim().to_string()).collect()
}

impl Args {
    /// Spec file first, then the command-line overrides.
    fn table_spec(&self) -> Result<TableSpec> {
        let mut spec = match &self.spec {
            Some(f) => TableSpec::from_file(f)
                .with_context(|| format!("loading spec {}", f.display()))?,
            None => TableSpec::default(),
        };
        if let Some(p) = &self.csv_path {
            spec.csv_path = Some(Some(p.clone()));
        }
        if let Some(n) = &self.name {
            spec.tbl_name = Some(n.clone());
        }
        if let Some(d) = &self.descr {
            spec.tbl_descr = Some(d.clone());
        }
        if let Some(d) = &self.delim {
            spec.delim = Some(d.clone());
        }
        if let Some(k) = &self.key {
            spec.key_fields = Some(trimmed(k.clone()));
        }
        if let Some(s) = &self.select {
            spec.sel_fields = Some(trimmed(s.clone()));
        }
        if let Some(n) = &self.numeric {
            spec.num_fields = Some(trimmed(n.clone()));
        }
        Ok(spec)
    }
}

fn render(row: &[Value]) -> String {
    row.iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(filter).init();

    // ─── 2) build the table ──────────────────────────────────────────
    let args = Args::parse();
    let dict = CsvDict::open(args.table_spec()?).context("failed to instantiate the table")?;

    let table = match dict.loaded().await {
        Ok(t) => t,
        Err(e) => {
            error!(table = %dict.name(), "load failed: {}", e);
            return Err(e.into());
        }
    };
    info!("Table named '{}' is loaded", table.name());

    // ─── 3) report ───────────────────────────────────────────────────
    let keys = table.keys();
    println!("{} Keys: {}", keys.len(), keys.join(", "));
    println!("{}", serde_json::to_string_pretty(&*table)?);

    if args.lookup.is_some() || args.fields.is_some() {
        let rows = table.values_for_keys(
            Selection::from(args.lookup.map(trimmed)),
            Selection::from(args.fields.map(trimmed)),
        );
        for row in &rows {
            println!("{}", render(row));
        }
    }
    Ok(())
}
