//! Tabular dataset assembled from stored ABPM tests.
//!
//! One row per reading, joined with the metadata of its test. Rows can be
//! enriched with every hemodynamic index: age at the reading is derived from
//! the birth date, height is normalized to meters, and the resulting
//! measurement is validated before the indices are computed.

use crate::{
    AbpmRecord, Error, HemodynamicIndex, HemodynamicProfile, PatientMeasurement, Result,
};
use chrono::NaiveDate;
use std::path::Path;

/// Base columns, in output order
pub const BASE_COLUMNS: [&str; 12] = [
    "patient_id",
    "birth_date",
    "start_date",
    "start_night",
    "end_night",
    "gender",
    "height",
    "weight",
    "measure_date_time",
    "systolic",
    "diastolic",
    "heart_rate",
];

/// Heights above this are taken to be in centimeters
const MAX_HEIGHT_METERS: f64 = 3.0;

/// One reading joined with its test metadata
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetRow {
    pub patient_id: u64,
    pub birth_date: Option<String>,
    pub start_date: Option<String>,
    pub start_night: Option<String>,
    pub end_night: Option<String>,
    pub gender: Option<String>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub measure_date_time: Option<String>,
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    pub heart_rate: Option<f64>,
}

/// Counts from one dataset write
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DatasetSummary {
    pub rows: usize,
    pub enriched: usize,
    pub skipped: usize,
}

/// Join each test's metadata with each of its readings.
///
/// Tests without metadata produce no rows.
pub fn build_rows(records: &[AbpmRecord]) -> Vec<DatasetRow> {
    let mut rows = Vec::new();
    for record in records {
        let Some(meta) = record.metadata() else {
            tracing::debug!("Test {} has no metadata, skipped", record.id);
            continue;
        };

        for reading in &record.data {
            rows.push(DatasetRow {
                patient_id: record.id,
                birth_date: meta.birth_date.clone(),
                start_date: meta.start_date.clone(),
                start_night: meta.start_night.clone(),
                end_night: meta.end_night.clone(),
                gender: meta.gender.clone(),
                height: meta.height,
                weight: meta.weight,
                measure_date_time: reading.taken_at.clone(),
                systolic: reading.systolic,
                diastolic: reading.diastolic,
                heart_rate: reading.heart_rate,
            });
        }
    }
    rows
}

/// Calendar day of a `YYYY-MM-DD[ T]...` timestamp
fn parse_day(value: &str) -> Result<NaiveDate> {
    let day = value
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or_default();
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| Error::Date(format!("{:?}: {}", value, e)))
}

/// Meters, whether the API reported meters or centimeters
pub fn normalize_height(height: f64) -> f64 {
    if height > MAX_HEIGHT_METERS {
        height / 100.0
    } else {
        height
    }
}

fn required<T: Copy>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| Error::InvalidMeasurement(format!("missing {}", field)))
}

impl DatasetRow {
    /// Whole years between birth and this reading
    pub fn age_at_reading(&self) -> Result<u32> {
        let birth = parse_day(required(self.birth_date.as_deref(), "birth_date")?)?;
        let taken = parse_day(required(self.measure_date_time.as_deref(), "measure_date_time")?)?;
        taken.years_since(birth).ok_or_else(|| {
            Error::InvalidMeasurement(format!("reading {} precedes birth {}", taken, birth))
        })
    }

    /// Validated pipeline input for this reading
    pub fn measurement(&self) -> Result<PatientMeasurement> {
        let measurement = PatientMeasurement::new(
            self.age_at_reading()? as f64,
            required(self.weight, "weight")?,
            normalize_height(required(self.height, "height")?),
            required(self.systolic, "systolic")?,
            required(self.diastolic, "diastolic")?,
            required(self.heart_rate, "heart_rate")?,
        );
        measurement.validate()?;
        Ok(measurement)
    }

    /// Measurement and indices, or the reason they could not be computed
    pub fn enrich(&self) -> Result<(PatientMeasurement, HemodynamicProfile)> {
        let measurement = self.measurement()?;
        Ok((measurement, measurement.profile()))
    }

    fn base_fields(&self) -> Vec<String> {
        vec![
            self.patient_id.to_string(),
            text(&self.birth_date),
            text(&self.start_date),
            text(&self.start_night),
            text(&self.end_night),
            text(&self.gender),
            number(self.height),
            number(self.weight),
            text(&self.measure_date_time),
            number(self.systolic),
            number(self.diastolic),
            number(self.heart_rate),
        ]
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Header row for a dataset with or without index columns
pub fn headers(with_indices: bool) -> Vec<&'static str> {
    let mut headers = BASE_COLUMNS.to_vec();
    if with_indices {
        headers.push("age");
        headers.extend(HemodynamicIndex::ALL.iter().map(|index| index.name()));
    }
    headers
}

/// Write rows to `csv_path`, replacing any previous dataset
pub fn write_dataset(
    rows: &[DatasetRow],
    csv_path: &Path,
    with_indices: bool,
) -> Result<DatasetSummary> {
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::Writer::from_path(csv_path)?;
    writer.write_record(headers(with_indices))?;

    let mut summary = DatasetSummary::default();
    for row in rows {
        let mut fields = row.base_fields();

        if with_indices {
            match row.enrich() {
                Ok((measurement, profile)) => {
                    fields.push(measurement.age.to_string());
                    fields.extend(profile.entries().map(|(_, value)| value.to_string()));

                    let faults = profile.non_finite();
                    if !faults.is_empty() {
                        tracing::debug!(
                            "Test {} at {:?}: non-finite {:?}",
                            row.patient_id,
                            row.measure_date_time,
                            faults
                        );
                    }
                    summary.enriched += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        "Test {} at {:?}: indices skipped: {}",
                        row.patient_id,
                        row.measure_date_time,
                        e
                    );
                    let blanks = HemodynamicIndex::ALL.len() + 1;
                    fields.extend(std::iter::repeat(String::new()).take(blanks));
                    summary.skipped += 1;
                }
            }
        }

        writer.write_record(&fields)?;
        summary.rows += 1;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} rows to {:?}", summary.rows, csv_path);
    Ok(summary)
}

/// Read every stored test under `records_dir` and write the dataset
pub fn build_dataset(
    records_dir: &Path,
    csv_path: &Path,
    with_indices: bool,
) -> Result<DatasetSummary> {
    let records = crate::store::read_records(records_dir)?;
    let rows = build_rows(&records);
    tracing::info!("Joined {} tests into {} rows", records.len(), rows.len());
    write_dataset(&rows, csv_path, with_indices)
}
