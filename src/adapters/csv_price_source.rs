//! CSV price source: one `{ASSET}.csv` file per asset, merged into a single
//! timestamp-ordered stream of bar batches.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::bar::PriceBar;
use crate::domain::error::NinetraderError;
use crate::ports::price_source::PriceSource;

#[derive(Debug)]
pub struct CsvPriceSource {
    steps: VecDeque<Vec<PriceBar>>,
}

impl CsvPriceSource {
    /// Read `{asset}.csv` for every configured asset under `base_path` and
    /// group rows by timestamp. Assets missing a row at some timestamp are
    /// simply absent from that batch.
    pub fn load(base_path: &Path, assets: &[String]) -> Result<Self, NinetraderError> {
        let mut by_timestamp: BTreeMap<NaiveDateTime, Vec<PriceBar>> = BTreeMap::new();

        for asset in assets {
            let path = base_path.join(format!("{asset}.csv"));
            for bar in read_asset_file(&path, asset)? {
                by_timestamp.entry(bar.timestamp).or_default().push(bar);
            }
        }

        let steps = by_timestamp
            .into_values()
            .map(|mut bars| {
                bars.sort_by(|a, b| a.asset.cmp(&b.asset));
                bars
            })
            .collect();

        Ok(Self { steps })
    }
}

impl PriceSource for CsvPriceSource {
    fn next_bars(&mut self) -> Result<Option<Vec<PriceBar>>, NinetraderError> {
        Ok(self.steps.pop_front())
    }
}

fn read_asset_file(path: &PathBuf, asset: &str) -> Result<Vec<PriceBar>, NinetraderError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| NinetraderError::Data {
        reason: format!("failed to open {}: {e}", path.display()),
    })?;

    let mut bars = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.map_err(|e| NinetraderError::Data {
            reason: format!("{}: row {}: {e}", path.display(), row + 1),
        })?;

        let timestamp = parse_timestamp(field_str(&record, 0, path, row, "date")?)
            .ok_or_else(|| NinetraderError::Data {
                reason: format!("{}: row {}: unrecognised date", path.display(), row + 1),
            })?;

        bars.push(PriceBar {
            asset: asset.to_string(),
            timestamp,
            open: field(&record, 1, path, row, "open")?,
            high: field(&record, 2, path, row, "high")?,
            low: field(&record, 3, path, row, "low")?,
            close: field(&record, 4, path, row, "close")?,
            volume: field(&record, 5, path, row, "volume")?,
        });
    }

    bars.sort_by_key(|b| b.timestamp);
    Ok(bars)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(ts);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn field_str<'a>(
    record: &'a csv::StringRecord,
    index: usize,
    path: &Path,
    row: usize,
    name: &str,
) -> Result<&'a str, NinetraderError> {
    record.get(index).ok_or_else(|| NinetraderError::Data {
        reason: format!("{}: row {}: missing {name} column", path.display(), row + 1),
    })
}

fn field<T: FromStr>(
    record: &csv::StringRecord,
    index: usize,
    path: &Path,
    row: usize,
    name: &str,
) -> Result<T, NinetraderError> {
    field_str(record, index, path, row, name)?
        .trim()
        .parse()
        .map_err(|_| NinetraderError::Data {
            reason: format!("{}: row {}: invalid {name} value", path.display(), row + 1),
        })
}
