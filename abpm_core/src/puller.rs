//! Batched pull of ABPM tests from the clinical API.
//!
//! Test ids are sequential. The puller requests them in batches of
//! `concurrent_workers` consecutive ids, all in flight at once, and after
//! each batch decides whether to continue:
//!
//! - a test whose first reading is dated after `end_date` means the pull has
//!   caught up with the cutoff; in-range tests of that batch are still saved
//! - more than `max_consecutive_errors` failed or empty tests in a row means
//!   the id range has run dry
//! - a test that cannot be written to the sink ends the pull with what was
//!   stored so far
//!
//! Failures are reported back in [`PullReport`], not written to a shared log.

use crate::client::AbpmSource;
use crate::config::PullConfig;
use crate::store::RecordSink;
use crate::{AbpmRecord, Result};
use chrono::NaiveDate;
use futures::future::join_all;
use std::time::Instant;

/// Parameters of one pull run
#[derive(Clone, Debug)]
pub struct PullOptions {
    pub start_id: u64,
    pub end_date: NaiveDate,
    pub concurrent_workers: usize,
    pub max_consecutive_errors: usize,
}

impl PullOptions {
    pub fn from_config(config: &PullConfig, start_id: u64) -> Self {
        Self {
            start_id,
            end_date: config.end_date,
            concurrent_workers: config.concurrent_workers,
            max_consecutive_errors: config.max_consecutive_errors,
        }
    }
}

/// Why the pull ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// A test dated after the cutoff was seen
    CutoffReached,
    /// Too many consecutive failed or empty tests
    TooManyErrors,
    /// A fetched test could not be written to the sink
    StorageFailed,
}

/// A test id that produced no usable record
#[derive(Clone, Debug)]
pub struct PullFailure {
    pub patient_id: u64,
    pub status: Option<u16>,
    pub reason: String,
}

/// Outcome of a pull run
#[derive(Clone, Debug)]
pub struct PullReport {
    pub saved: usize,
    pub failures: Vec<PullFailure>,
    /// First id not yet stored or given up on; a resumed pull starts here
    pub next_id: u64,
    pub stop_reason: StopReason,
}

/// Date of the first reading of a test (`fecha_dt` is `YYYY-M-D HH:MM:SS`)
pub fn first_reading_date(record: &AbpmRecord) -> Option<NaiveDate> {
    let taken_at = record.data.first()?.taken_at.as_deref()?;
    let day = taken_at.split_whitespace().next()?;
    match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!(
                "Test {}: unparseable reading date {:?}: {}",
                record.id,
                taken_at,
                e
            );
            None
        }
    }
}

/// Whether the test started after `end_date`. Tests without a dated
/// reading never do.
fn is_past_cutoff(record: &AbpmRecord, end_date: NaiveDate) -> bool {
    first_reading_date(record).map_or(false, |date| date > end_date)
}

/// Whether any test of a batch started after `end_date`
pub fn batch_exceeds_cutoff<'a>(
    records: impl IntoIterator<Item = &'a AbpmRecord>,
    end_date: NaiveDate,
) -> bool {
    records
        .into_iter()
        .any(|record| is_past_cutoff(record, end_date))
}

/// Pull tests from `source` into `sink` until a stop condition is met
pub async fn pull<S, K>(source: &S, sink: &mut K, options: &PullOptions) -> Result<PullReport>
where
    S: AbpmSource + ?Sized,
    K: RecordSink + ?Sized,
{
    let workers = options.concurrent_workers.max(1) as u64;
    let started = Instant::now();

    let mut next_id = options.start_id;
    let mut consecutive_errors = 0usize;
    let mut saved = 0usize;
    let mut failures = Vec::new();

    tracing::info!(
        "Pulling from test {} until {} ({} concurrent requests)",
        next_id,
        options.end_date,
        workers
    );

    loop {
        let batch_end = next_id + workers;
        let results = join_all((next_id..batch_end).map(|id| async move {
            (id, source.fetch_record(id).await)
        }))
        .await;

        let cutoff_reached = batch_exceeds_cutoff(
            results.iter().filter_map(|(_, result)| result.as_ref().ok()),
            options.end_date,
        );

        for (id, result) in results {
            match result {
                Ok(record) if record.has_readings() => {
                    if cutoff_reached && is_past_cutoff(&record, options.end_date) {
                        tracing::debug!("Test {} is past the cutoff, not saved", id);
                        continue;
                    }
                    if let Err(e) = sink.save(&record) {
                        tracing::error!("Test {} could not be stored: {}", id, e);
                        failures.push(PullFailure {
                            patient_id: id,
                            status: None,
                            reason: format!("not stored: {}", e),
                        });
                        return Ok(finish(saved, failures, id, StopReason::StorageFailed));
                    }
                    saved += 1;
                    consecutive_errors = 0;
                }
                Ok(_) => {
                    consecutive_errors += 1;
                    failures.push(PullFailure {
                        patient_id: id,
                        status: None,
                        reason: "no readings".into(),
                    });
                }
                Err(e) => {
                    consecutive_errors += 1;
                    tracing::warn!("Test {}: {}", id, e);
                    failures.push(PullFailure {
                        patient_id: id,
                        status: e.status(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        next_id = batch_end;

        let elapsed = started.elapsed().as_secs_f64();
        tracing::info!(
            "Up to test {}: {} saved ({:.1} records/s), {} consecutive errors",
            batch_end - 1,
            saved,
            if elapsed > 0.0 { saved as f64 / elapsed } else { 0.0 },
            consecutive_errors
        );

        let stop_reason = if cutoff_reached {
            Some(StopReason::CutoffReached)
        } else if consecutive_errors > options.max_consecutive_errors {
            Some(StopReason::TooManyErrors)
        } else {
            None
        };

        if let Some(stop_reason) = stop_reason {
            return Ok(finish(saved, failures, next_id, stop_reason));
        }
    }
}

fn finish(
    saved: usize,
    failures: Vec<PullFailure>,
    next_id: u64,
    stop_reason: StopReason,
) -> PullReport {
    tracing::info!(
        "Pull finished ({:?}): {} saved, {} failed",
        stop_reason,
        saved,
        failures.len()
    );
    PullReport {
        saved,
        failures,
        next_id,
        stop_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, Reading};
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    fn dated_record(id: u64, date: &str) -> AbpmRecord {
        AbpmRecord {
            id,
            data: vec![Reading {
                taken_at: Some(format!("{} 03:55:21", date)),
                systolic: Some(120.0),
                diastolic: Some(80.0),
                heart_rate: Some(70.0),
                ..Default::default()
            }],
            meta_data: vec![],
            measure: serde_json::Value::Null,
            drugs: serde_json::Value::Null,
        }
    }

    fn empty_record(id: u64) -> AbpmRecord {
        AbpmRecord {
            id,
            data: vec![],
            meta_data: vec![],
            measure: serde_json::Value::Null,
            drugs: serde_json::Value::Null,
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    /// In-memory API: ids not present answer 404
    #[derive(Default)]
    struct FakeSource {
        records: HashMap<u64, AbpmRecord>,
        requested: Mutex<HashSet<u64>>,
    }

    impl FakeSource {
        fn with(records: impl IntoIterator<Item = AbpmRecord>) -> Self {
            Self {
                records: records.into_iter().map(|r| (r.id, r)).collect(),
                requested: Mutex::new(HashSet::new()),
            }
        }

        fn max_requested(&self) -> u64 {
            self.requested.lock().unwrap().iter().copied().max().unwrap()
        }
    }

    #[async_trait]
    impl AbpmSource for FakeSource {
        async fn fetch_record(&self, patient_id: u64) -> Result<AbpmRecord> {
            self.requested.lock().unwrap().insert(patient_id);
            self.records.get(&patient_id).cloned().ok_or(Error::Api {
                status: 404,
                url: format!("fake/{}/", patient_id),
            })
        }
    }

    #[derive(Default)]
    struct MemorySink(Vec<AbpmRecord>);

    impl RecordSink for MemorySink {
        fn save(&mut self, record: &AbpmRecord) -> Result<()> {
            self.0.push(record.clone());
            Ok(())
        }
    }

    /// Accepts a fixed number of records, then fails like a full disk
    struct FullSink {
        stored: Vec<AbpmRecord>,
        capacity: usize,
    }

    impl RecordSink for FullSink {
        fn save(&mut self, record: &AbpmRecord) -> Result<()> {
            if self.stored.len() >= self.capacity {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "no space left on device",
                )));
            }
            self.stored.push(record.clone());
            Ok(())
        }
    }

    fn options(start_id: u64, workers: usize, max_errors: usize) -> PullOptions {
        PullOptions {
            start_id,
            end_date: date("2020-01-01"),
            concurrent_workers: workers,
            max_consecutive_errors: max_errors,
        }
    }

    #[test]
    fn test_batch_exceeds_cutoff() {
        let newer = dated_record(1, "2015-1-1");
        assert!(batch_exceeds_cutoff([&newer], date("2011-01-01")));

        let older = dated_record(2, "2011-1-1");
        assert!(!batch_exceeds_cutoff([&older], date("2015-01-01")));

        let empty = empty_record(3);
        assert!(!batch_exceeds_cutoff([&empty, &older], date("2015-01-01")));
    }

    #[test]
    fn test_first_reading_date() {
        assert_eq!(
            first_reading_date(&dated_record(1, "2019-7-4")),
            Some(date("2019-07-04"))
        );
        assert_eq!(first_reading_date(&empty_record(1)), None);

        let mut garbled = dated_record(1, "2019-7-4");
        garbled.data[0].taken_at = Some("yesterday".into());
        assert_eq!(first_reading_date(&garbled), None);
    }

    #[tokio::test]
    async fn test_pull_stops_at_cutoff() {
        let mut records: Vec<_> = (1..=12).map(|id| dated_record(id, "2019-5-1")).collect();
        records.push(dated_record(13, "2020-2-1"));
        let source = FakeSource::with(records);
        let mut sink = MemorySink::default();

        let report = pull(&source, &mut sink, &options(1, 5, 150)).await.unwrap();

        assert_eq!(report.stop_reason, StopReason::CutoffReached);
        assert_eq!(report.saved, 12);
        assert_eq!(sink.0.len(), 12);
        assert!(sink.0.iter().all(|r| r.id != 13));
        assert_eq!(report.next_id, 16);
        assert_eq!(source.max_requested(), 15);
    }

    #[tokio::test]
    async fn test_pull_stops_after_consecutive_errors() {
        let source = FakeSource::with((1..=3).map(|id| dated_record(id, "2019-5-1")));
        let mut sink = MemorySink::default();

        let report = pull(&source, &mut sink, &options(1, 4, 5)).await.unwrap();

        assert_eq!(report.stop_reason, StopReason::TooManyErrors);
        assert_eq!(report.saved, 3);
        assert_eq!(report.failures.len(), 9);
        assert!(report.failures.iter().all(|f| f.status == Some(404)));
        assert_eq!(report.next_id, 13);
    }

    #[tokio::test]
    async fn test_success_resets_error_count() {
        let mut records: Vec<_> = (1..=19)
            .filter(|id| id % 3 != 0)
            .map(|id| dated_record(id, "2019-5-1"))
            .collect();
        records.push(dated_record(20, "2021-1-1"));
        let source = FakeSource::with(records);
        let mut sink = MemorySink::default();

        let report = pull(&source, &mut sink, &options(1, 4, 1)).await.unwrap();

        assert_eq!(report.stop_reason, StopReason::CutoffReached);
        assert_eq!(report.saved, 13);
        assert_eq!(report.failures.len(), 6);
    }

    #[tokio::test]
    async fn test_empty_tests_count_as_errors() {
        let source = FakeSource::with((1..=10).map(empty_record));
        let mut sink = MemorySink::default();

        let report = pull(&source, &mut sink, &options(1, 10, 3)).await.unwrap();

        assert_eq!(report.stop_reason, StopReason::TooManyErrors);
        assert_eq!(report.saved, 0);
        assert!(report.failures.iter().all(|f| f.reason == "no readings"));
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_report() {
        let source = FakeSource::with((1..=20).map(|id| dated_record(id, "2019-5-1")));
        let mut sink = FullSink {
            stored: Vec::new(),
            capacity: 6,
        };

        let report = pull(&source, &mut sink, &options(1, 4, 150)).await.unwrap();

        assert_eq!(report.stop_reason, StopReason::StorageFailed);
        assert_eq!(report.saved, 6);
        assert_eq!(sink.stored.len(), 6);
        assert_eq!(report.next_id, 7);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].patient_id, 7);
        assert!(report.failures[0].reason.contains("no space left"));
        assert_eq!(source.max_requested(), 8);
    }
}
