//! The `Source` trait and the built-in sources that implement it.
//!
//! Ported from `original_source/source/{source,filesystem,hdfs}.go`. Lives
//! in this crate rather than the top `quill` crate (where
//! `quill::sources` is documented to sit) because `quill_sql`'s parser
//! binds a relation's `Source` at parse time, the same as the Go parser's
//! `wantSource` calling `source.NewSource` directly — and `quill_sql`
//! cannot depend on `quill` without a cycle. `quill` re-exports this
//! module as `quill::sources`.
use quill_common::schema::StructField;
use quill_common::{Error, Result, Row};
use quill_expr::Expr;
use std::collections::HashMap;
use std::fmt;
use std::process::Command;
use std::sync::Arc;

/// Opaque to the engine core and forwarded verbatim to source
/// constructors, matching the Go source's empty `config.SQLConf{}`
/// (§6). The one piece of state it carries beyond that — a table-name
/// registry of already-built sources — lets a caller (tests, an
/// embedding application) hand the engine an in-memory `Source` under a
/// bare name instead of only a filesystem path or `hdfs://` URI; `build`
/// consults it before falling back to the `fs`/`hdfs` dispatch in §6.
#[derive(Debug, Default, Clone)]
pub struct Config {
    tables: HashMap<String, Arc<dyn Source>>,
}

impl Config {
    /// Registers `source` under `name` so `from <name>` resolves to it
    /// directly instead of being dispatched as a filesystem path.
    pub fn with_table(mut self, name: impl Into<String>, source: Arc<dyn Source>) -> Self {
        self.tables.insert(name.into(), source);
        self
    }
}

/// A data producer a `Relation` plan node wraps.
///
/// `execute` receives the predicate conjuncts pushed down onto this
/// relation (`crate::optimizer::PushDownPredicateIntoSource`); a source is
/// free to ignore them; both built-ins do.
pub trait Source: fmt::Debug + Send + Sync {
    fn schema(&self) -> Vec<StructField>;
    fn execute(&self, push_down_predicate: &[Expr]) -> Result<Vec<Row>>;
}

fn build_schema(fields: &[(&str, quill_common::DataType)]) -> Vec<StructField> {
    fields
        .iter()
        .map(|(name, data_type)| StructField {
            name: (*name).to_string(),
            data_type: *data_type,
        })
        .collect()
}

pub mod fs {
    use super::*;
    use quill_common::DataType;
    use quill_common::ScalarValue;
    use std::time::UNIX_EPOCH;

    /// Lists a local directory, one row per entry.
    #[derive(Debug)]
    pub struct FsSource {
        path: String,
    }

    impl FsSource {
        pub fn new(path: impl Into<String>) -> Self {
            FsSource { path: path.into() }
        }
    }

    impl Source for FsSource {
        fn schema(&self) -> Vec<StructField> {
            build_schema(&[
                ("name", DataType::String),
                ("size", DataType::Int),
                ("modify_time", DataType::Int),
                ("is_dir", DataType::Boolean),
            ])
        }

        fn execute(&self, _push_down_predicate: &[Expr]) -> Result<Vec<Row>> {
            let dir = std::fs::read_dir(&self.path)
                .map_err(|e| Error::execution(format!("{e}")))?;
            let mut rows = Vec::new();
            for entry in dir {
                let entry = entry.map_err(|e| Error::execution(format!("{e}")))?;
                let metadata = entry.metadata().map_err(|e| Error::execution(format!("{e}")))?;
                let modify_time = metadata
                    .modified()
                    .ok()
                    .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0);
                let name = entry.file_name().to_string_lossy().into_owned();
                rows.push(Row::from_iter([
                    ScalarValue::String(Some(name)),
                    ScalarValue::Int(Some(metadata.len() as i64)),
                    ScalarValue::Int(Some(modify_time)),
                    ScalarValue::Boolean(Some(metadata.is_dir())),
                ]));
            }
            Ok(rows)
        }
    }
}

pub mod hdfs {
    use super::*;
    use quill_common::DataType;
    use quill_common::ScalarValue;

    /// Shells out to `hadoop fs -ls` or `hadoop fs -du [-s]`.
    #[derive(Debug)]
    pub struct HdfsSource {
        path: String,
        du: bool,
        s: bool,
    }

    impl HdfsSource {
        pub fn new(path: impl Into<String>, du: bool, s: bool) -> Self {
            HdfsSource {
                path: path.into(),
                du,
                s,
            }
        }

        fn run(&self, args: &[&str]) -> Result<Option<String>> {
            let output = Command::new("hadoop")
                .arg("fs")
                .args(args)
                .output()
                .map_err(|e| Error::execution(format!("{e}")))?;
            if output.status.success() {
                return Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()));
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("No such file or directory") {
                return Ok(None);
            }
            Err(Error::execution(format!(
                "hadoop fs failed: {}",
                stderr.trim()
            )))
        }
    }

    impl Source for HdfsSource {
        fn schema(&self) -> Vec<StructField> {
            if self.du {
                build_schema(&[("size", DataType::Int), ("name", DataType::String)])
            } else {
                build_schema(&[
                    ("owner", DataType::String),
                    ("size", DataType::Int),
                    ("modify_date", DataType::String),
                    ("modify_time", DataType::String),
                    ("name", DataType::String),
                ])
            }
        }

        fn execute(&self, _push_down_predicate: &[Expr]) -> Result<Vec<Row>> {
            if self.du {
                let mut args = vec!["-du"];
                if self.s {
                    args.push("-s");
                }
                args.push(&self.path);
                let Some(output) = self.run(&args)? else {
                    return Ok(Vec::new());
                };
                let mut rows = Vec::new();
                for line in output.lines() {
                    let split: Vec<&str> = line.split_whitespace().collect();
                    if split.len() < 3 {
                        continue;
                    }
                    let size: i64 = split[0]
                        .parse()
                        .map_err(|_| Error::execution(format!("bad hdfs du output: {line}")))?;
                    rows.push(Row::from_iter([
                        ScalarValue::Int(Some(size)),
                        ScalarValue::String(Some(split[2].to_string())),
                    ]));
                }
                return Ok(rows);
            }
            let Some(output) = self.run(&["-ls", &self.path])? else {
                return Ok(Vec::new());
            };
            let found_re = "Found ";
            let mut rows = Vec::new();
            for line in output.lines() {
                if line.starts_with(found_re) && line.ends_with("items") {
                    continue;
                }
                let split: Vec<&str> = line.split_whitespace().collect();
                if split.len() < 8 {
                    continue;
                }
                let size: i64 = split[4]
                    .parse()
                    .map_err(|_| Error::execution(format!("bad hdfs ls output: {line}")))?;
                rows.push(Row::from_iter([
                    ScalarValue::String(Some(split[2].to_string())),
                    ScalarValue::Int(Some(size)),
                    ScalarValue::String(Some(split[5].to_string())),
                    ScalarValue::String(Some(split[6].to_string())),
                    ScalarValue::String(Some(split[7].to_string())),
                ]));
            }
            Ok(rows)
        }
    }
}

/// Dispatches an input string to a concrete `Source`, matching
/// `original_source/source/source.go::NewSource`.
///
/// `hdfs://...` selects the HDFS source directly; a bare path with a
/// single whitespace-delimited token is a filesystem path; a leading
/// `hdfs`/`fs` token selects that source, consuming the remaining tokens
/// as its arguments (`-du`/`-s` for hdfs).
pub fn build(config: &Config, input: &str) -> Result<Arc<dyn Source>> {
    if let Some(source) = config.tables.get(input) {
        return Ok(Arc::clone(source));
    }
    if let Some(path) = input.strip_prefix("hdfs://") {
        return Ok(Arc::new(hdfs::HdfsSource::new(
            format!("hdfs://{path}"),
            false,
            false,
        )));
    }
    let tokens: Vec<&str> = input.split_whitespace().collect();
    if tokens.len() == 1 {
        return Ok(Arc::new(fs::FsSource::new(input)));
    }
    match tokens.first().copied() {
        Some("fs") => Ok(Arc::new(fs::FsSource::new(tokens[1]))),
        Some("hdfs") => {
            let args = &tokens[1..];
            let du = args.contains(&"-du");
            let s = args.contains(&"-s");
            let path = args.last().copied().unwrap_or_default();
            Ok(Arc::new(hdfs::HdfsSource::new(path, du, s)))
        }
        _ => Err(Error::execution(format!(
            "nonsupport data source: {input}"
        ))),
    }
}
