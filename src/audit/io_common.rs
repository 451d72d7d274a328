use crate::audit::*;

use serde::Deserialize;

/// Why a source row could not be used.
#[derive(Debug)]
pub enum RowError {
    /// The row is dropped, or fails the run in strict mode.
    Malformed(String),
    /// The run cannot continue, whatever the policy.
    Fatal(AuditError),
}

impl From<AuditErrors> for RowError {
    fn from(e: AuditErrors) -> Self {
        RowError::Fatal(AuditError::Pipeline { source: e })
    }
}

pub type RowResult<T> = Result<Option<T>, RowError>;

/// Collects the rows of one source file and applies the malformed row policy.
pub struct RowSink<T> {
    path: String,
    strict: bool,
    rows: Vec<T>,
    dropped: usize,
}

impl<T> RowSink<T> {
    pub fn new(path: &str, strict: bool) -> RowSink<T> {
        RowSink {
            path: path.to_string(),
            strict,
            rows: Vec::new(),
            dropped: 0,
        }
    }

    /// Ok(None) rows are filtered out on purpose and not counted.
    pub fn push(&mut self, lineno: u64, row: RowResult<T>) -> AuditResult<()> {
        match row {
            Ok(Some(r)) => self.rows.push(r),
            Ok(None) => {}
            Err(RowError::Malformed(message)) if self.strict => {
                return MalformedRowSnafu {
                    path: self.path.clone(),
                    lineno,
                    message,
                }
                .fail();
            }
            Err(RowError::Malformed(message)) => {
                debug!("{}: line {}: dropping row: {}", self.path, lineno, message);
                self.dropped += 1;
            }
            Err(RowError::Fatal(e)) => return Err(e),
        }
        Ok(())
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn finish(self) -> Vec<T> {
        if self.dropped() > 0 {
            warn!("{}: dropped {} malformed rows", self.path, self.dropped());
        }
        self.rows
    }
}

/// Parses a count, such as a number of votes.
pub fn parse_count(field: &str, value: &str) -> Result<u64, RowError> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| RowError::Malformed(format!("{}: not a count: {:?}", field, value)))
}

/// Parses a percentage such as `51.2%` or `51.2`.
pub fn parse_percentage(field: &str, value: &str) -> Result<f64, RowError> {
    let v = value.trim();
    let v = v.strip_suffix('%').unwrap_or(v).trim();
    match v.parse::<f64>() {
        Ok(x) if x.is_finite() && (0.0..=100.0).contains(&x) => Ok(x),
        _ => Err(RowError::Malformed(format!(
            "{}: not a percentage: {:?}",
            field, value
        ))),
    }
}

pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "t" | "yes")
}

#[derive(Debug, Deserialize)]
struct StateAbbrRow {
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "Standard")]
    standard: String,
    #[serde(rename = "Postal")]
    postal: String,
}

/// Reads a tab-separated state table with `State`, `Standard` and `Postal`
/// columns.
pub fn read_state_table(path: &str) -> AuditResult<StateTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .trim(csv::Trim::All)
        .from_path(path)
        .context(CsvOpenSnafu { path })?;
    let mut rows: Vec<(String, String, String)> = Vec::new();
    for (idx, rec) in rdr.deserialize().enumerate() {
        let r: StateAbbrRow = rec.context(CsvLineParseSnafu {
            path,
            lineno: (idx + 2) as u64,
        })?;
        rows.push((r.state, r.standard, r.postal));
    }
    StateTable::from_rows(&rows).context(InvalidDataSnafu { path })
}
