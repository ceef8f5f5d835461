use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use regex::Regex;
use tracing::{debug, info};

use crate::error::{Error, Result};

const KNOWN_COLUMNS: [&str; 4] = ["PARAM", "AVG_TIME", "RUN", "FAILED"];
const CANDIDATE_DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Mean and sample standard deviation of AVG_TIME for one PARAM value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSummary {
    pub param: String,
    pub mean: f64,
    pub std: f64,
    pub runs: usize,
}

/// A CSV's usable rows after dropping FAILED=1 runs.
#[derive(Debug, Clone, Default)]
pub struct LoadedCsv {
    pub rows: Vec<(String, f64)>,
    pub excluded_failed: usize,
}

/// Pick whichever candidate delimiter appears most often in the first line.
pub fn sniff_delimiter(first_line: &str) -> u8 {
    CANDIDATE_DELIMITERS
        .iter()
        .map(|&d| (d, first_line.bytes().filter(|&b| b == d).count()))
        .filter(|&(_, n)| n > 0)
        .max_by_key(|&(_, n)| n)
        .map(|(d, _)| d)
        .unwrap_or(b',')
}

/// Reads AVG_TIME cells written by hand or by older scripts: `12.5`,
/// `12.5ms`, `12,5 ms` and `0.0125s` all mean 12.5 ms.
pub struct DurationParser {
    number: Regex,
}

impl DurationParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            number: Regex::new(r"[\d.,]+")?,
        })
    }

    pub fn to_ms(&self, raw: &str) -> f64 {
        let s = raw.trim().to_lowercase();
        let Some(m) = self.number.find(&s) else {
            return f64::NAN;
        };
        let Ok(value) = m.as_str().replace(',', ".").parse::<f64>() else {
            return f64::NAN;
        };

        if s.contains("ms") {
            value
        } else if s.contains('s') {
            value * 1000.0
        } else {
            value
        }
    }
}

fn looks_numeric(field: &str) -> bool {
    let stripped: String = field.trim().chars().filter(|c| *c != '.' && *c != '-').collect();
    !stripped.is_empty() && stripped.chars().all(|c| c.is_ascii_digit())
}

fn is_header_row(fields: &[String]) -> bool {
    fields
        .iter()
        .any(|f| KNOWN_COLUMNS.contains(&f.trim().to_uppercase().as_str()))
        || fields.iter().all(|f| !looks_numeric(f))
}

fn default_columns(n: usize) -> Vec<String> {
    match n {
        4 => KNOWN_COLUMNS.iter().map(|c| c.to_string()).collect(),
        3 => KNOWN_COLUMNS[..3].iter().map(|c| c.to_string()).collect(),
        _ => ["PARAM", "AVG_TIME"]
            .iter()
            .map(|c| c.to_string())
            .chain((2..n).map(|i| format!("COL{}", i)))
            .take(n)
            .collect(),
    }
}

pub fn read_samples(path: &Path) -> Result<LoadedCsv> {
    let file = path.display().to_string();
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(Error::MissingCsv(file)),
        Err(e) => return Err(e.into()),
    };

    let first_line = contents
        .lines()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| Error::NoData(file.clone()))?;
    let delimiter = sniff_delimiter(first_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(contents.as_bytes());

    let mut records: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        records.push(record.iter().map(|f| f.to_string()).collect());
    }
    if records.is_empty() {
        return Err(Error::NoData(file));
    }

    let columns: Vec<String> = if is_header_row(&records[0]) {
        records
            .remove(0)
            .iter()
            .map(|c| c.trim().to_uppercase())
            .collect()
    } else {
        default_columns(records[0].len())
    };

    let index_of = |name: &str| columns.iter().position(|c| c == name);
    let failed_idx = index_of("FAILED");
    let (Some(param_idx), Some(avg_idx)) = (index_of("PARAM"), index_of("AVG_TIME")) else {
        return Err(Error::MissingColumns {
            file,
            found: columns,
        });
    };

    let parser = DurationParser::new()?;
    let mut loaded = LoadedCsv::default();
    for record in &records {
        let failed = failed_idx
            .and_then(|i| record.get(i))
            .and_then(|f| f.parse::<f64>().ok())
            .is_some_and(|v| v != 0.0);
        if failed {
            loaded.excluded_failed += 1;
            continue;
        }

        let Some(param) = record.get(param_idx) else {
            continue;
        };
        let avg = record
            .get(avg_idx)
            .map(|raw| parser.to_ms(raw))
            .unwrap_or(f64::NAN);
        loaded.rows.push((param.clone(), avg));
    }

    debug!(
        "Read {} rows from {} ({} failed runs excluded)",
        loaded.rows.len(),
        file,
        loaded.excluded_failed
    );
    Ok(loaded)
}

/// Group rows by PARAM and compute mean and sample std-dev, ignoring NaN
/// averages. Groups are ordered numerically, non-numeric labels last.
pub fn summarize(rows: &[(String, f64)]) -> Vec<ParamSummary> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for (param, avg) in rows {
        let values = groups.entry(param.as_str()).or_default();
        if avg.is_finite() {
            values.push(*avg);
        }
    }

    let mut summaries: Vec<ParamSummary> = groups
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(param, values)| {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let std = if values.len() > 1 {
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
                var.sqrt()
            } else {
                0.0
            };
            ParamSummary {
                param: param.to_string(),
                mean,
                std,
                runs: values.len(),
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        let na = a.param.parse::<f64>().ok();
        let nb = b.param.parse::<f64>().ok();
        match (na, nb) {
            (Some(x), Some(y)) => x.total_cmp(&y).then_with(|| a.param.cmp(&b.param)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.param.cmp(&b.param),
        }
    });
    summaries
}

pub fn load_and_prepare(path: &Path) -> Result<Vec<ParamSummary>> {
    let loaded = read_samples(path)?;
    if loaded.excluded_failed > 0 {
        info!(
            "{}: ignoring {} failed runs",
            path.display(),
            loaded.excluded_failed
        );
    }
    let summaries = summarize(&loaded.rows);
    if summaries.is_empty() {
        return Err(Error::NoData(path.display().to_string()));
    }
    Ok(summaries)
}
