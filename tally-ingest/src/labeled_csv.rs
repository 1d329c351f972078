//! Parse labeled-transaction CSV exports.
//!
//! Expected columns:
//! date,description,amount,merchant,category
//!
//! Dates accept `YYYY-MM-DD` or `MM/DD/YYYY`. Rows with an unparseable
//! date or amount are skipped rather than failing the whole file.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One labeled transaction ready to seed the training corpus
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabeledTransaction {
    pub date: NaiveDate,
    pub description: String,
    pub amount: f64,
    pub merchant: Option<String>,
    pub category_id: String,
}

/// Parse a labeled CSV file, returning all valid rows.
pub fn parse_labeled_csv(path: impl AsRef<Path>) -> Result<Vec<LabeledTransaction>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_path(path.as_ref())
        .with_context(|| format!("opening {}", path.as_ref().display()))?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;

        let date_str = record.get(0).unwrap_or("").trim();
        let date = match parse_date(date_str) {
            Some(d) => d,
            None => continue, // skip unparseable rows
        };

        let description = record.get(1).unwrap_or("").trim().to_string();
        if description.is_empty() {
            continue;
        }

        let amount: f64 = match record.get(2).unwrap_or("").trim().parse() {
            Ok(a) => a,
            Err(_) => continue,
        };

        let merchant = record
            .get(3)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from);

        let category_id = record.get(4).unwrap_or("").trim().to_string();
        if category_id.is_empty() {
            continue;
        }

        rows.push(LabeledTransaction { date, description, amount, merchant, category_id });
    }

    Ok(rows)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_csv(tag: &str, content: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("tally-ingest-{tag}-{}.csv", std::process::id()));
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_valid_rows() {
        let path = write_csv(
            "valid",
            "date,description,amount,merchant,category\n\
             2026-03-01,星巴克 咖啡,150,星巴克,food\n\
             03/02/2026,捷運 儲值,500,,transport\n",
        );

        let rows = parse_labeled_csv(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(rows[0].merchant.as_deref(), Some("星巴克"));
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(rows[1].merchant, None);
    }

    #[test]
    fn test_skips_bad_rows() {
        let path = write_csv(
            "bad",
            "date,description,amount,merchant,category\n\
             not-a-date,午餐,100,,food\n\
             2026-03-01,午餐,not-a-number,,food\n\
             2026-03-01,,100,,food\n\
             2026-03-01,午餐,100,,\n\
             2026-03-01,午餐 便當,100,,food\n",
        );

        let rows = parse_labeled_csv(&path).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "午餐 便當");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(parse_labeled_csv("/definitely/not/here.csv").is_err());
    }
}
