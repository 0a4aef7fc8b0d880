//! The extraction and load pipeline.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::{debug, info, warn};

use fitflux_types::{Batch, FieldValue};

use crate::stream::DailyValue;
use crate::window::{is_within_window, parse_record_date};
use crate::{FitnessSource, MetricStream, PipelineConfig, PipelineError, SeriesSink};

/// What a single stream contributed to a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamReport {
    pub stream: MetricStream,
    /// Points written across all batches.
    pub points: usize,
    /// Records outside the window, or intraday samples in a DST gap.
    pub skipped: usize,
    /// Write calls made.
    pub batches: usize,
}

impl StreamReport {
    fn new(stream: MetricStream) -> Self {
        Self {
            stream,
            points: 0,
            skipped: 0,
            batches: 0,
        }
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub streams: Vec<StreamReport>,
}

impl RunReport {
    /// Report for a single stream, if it ran.
    pub fn get(&self, stream: MetricStream) -> Option<&StreamReport> {
        self.streams.iter().find(|r| r.stream == stream)
    }

    /// Points written across all streams.
    pub fn total_points(&self) -> usize {
        self.streams.iter().map(|r| r.points).sum()
    }

    /// Write calls made across all streams.
    pub fn total_batches(&self) -> usize {
        self.streams.iter().map(|r| r.batches).sum()
    }
}

/// Loads fitness records from a [`FitnessSource`] into a [`SeriesSink`].
///
/// Streams run one after another, each finishing all of its writes before
/// the next starts. The first error aborts the run.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = Pipeline::new(PipelineConfig::default());
/// let report = pipeline.run(&fitbit, &influx).await?;
/// println!("wrote {} points", report.total_points());
/// ```
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    /// Create a pipeline.
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// The configuration this pipeline runs with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every configured stream against the current time.
    pub async fn run<F, K>(&self, source: &F, sink: &K) -> Result<RunReport, PipelineError>
    where
        F: FitnessSource,
        K: SeriesSink,
    {
        self.run_at(source, sink, Utc::now()).await
    }

    /// Run every configured stream with `now` as the current instant.
    pub async fn run_at<F, K>(
        &self,
        source: &F,
        sink: &K,
        now: DateTime<Utc>,
    ) -> Result<RunReport, PipelineError>
    where
        F: FitnessSource,
        K: SeriesSink,
    {
        let mut report = RunReport::default();

        for &stream in &self.config.streams {
            let stream_report = match stream {
                MetricStream::Steps => {
                    info!("Loading step data");
                    let records = source
                        .fetch_step_history()
                        .await
                        .map_err(|e| fetch_error(stream, e))?;
                    self.load_daily(stream, &records, sink, now).await?
                }
                MetricStream::Weight => {
                    info!("Loading body weight data");
                    let records = source
                        .fetch_weight_history()
                        .await
                        .map_err(|e| fetch_error(stream, e))?;
                    self.load_daily(stream, &records, sink, now).await?
                }
                MetricStream::RestingHeart => {
                    info!("Loading resting heart rate data");
                    let records = source
                        .fetch_resting_heart_history()
                        .await
                        .map_err(|e| fetch_error(stream, e))?;
                    self.load_daily(stream, &records, sink, now).await?
                }
                MetricStream::IntradayHeart => {
                    info!(
                        "Loading {} of 1s intraday heart rate data",
                        self.config.window
                    );
                    self.load_intraday(source, sink, now).await?
                }
            };

            info!(
                "Done loading {}: {} points in {} batches ({} skipped)",
                stream, stream_report.points, stream_report.batches, stream_report.skipped
            );
            report.streams.push(stream_report);
        }

        Ok(report)
    }

    /// Filter daily records through the window and build the stream's batch.
    ///
    /// Returns the batch and the number of records left out. A malformed
    /// date fails the whole batch.
    pub fn build_daily_batch<R: DailyValue>(
        &self,
        stream: MetricStream,
        records: &[R],
        now: DateTime<Utc>,
    ) -> Result<(Batch, usize), PipelineError> {
        let spec = stream.spec();
        let mut batch = Batch::new(&self.config.database, self.config.precision);
        let mut skipped = 0;

        for record in records {
            let recorded_at =
                parse_record_date(record.date()).map_err(|source| PipelineError::Parse {
                    stream,
                    value: record.date().to_string(),
                    source,
                })?;

            if !is_within_window(recorded_at, now, self.config.window) {
                skipped += 1;
                continue;
            }

            let point = spec
                .point(record.value(), recorded_at)
                .map_err(|source| PipelineError::Point { stream, source })?;
            batch.add_point(point);
        }

        Ok((batch, skipped))
    }

    async fn load_daily<R, K>(
        &self,
        stream: MetricStream,
        records: &[R],
        sink: &K,
        now: DateTime<Utc>,
    ) -> Result<StreamReport, PipelineError>
    where
        R: DailyValue,
        K: SeriesSink,
    {
        let (batch, skipped) = self.build_daily_batch(stream, records, now)?;

        let mut report = StreamReport::new(stream);
        report.points = batch.len();
        report.skipped = skipped;

        debug!(
            "Writing {} {} points ({} of {} records skipped)",
            batch.len(),
            stream,
            skipped,
            records.len()
        );
        write_batch(stream, sink, batch).await?;
        report.batches = 1;

        Ok(report)
    }

    /// The calendar days the intraday loop visits, newest first.
    ///
    /// Today is taken in the configured timezone.
    pub fn intraday_days(&self, now: DateTime<Utc>) -> Vec<NaiveDate> {
        let today = now.with_timezone(&self.config.timezone).date_naive();
        (0..self.config.window.as_days())
            .map(|i| today - Duration::days(i64::from(i)))
            .collect()
    }

    async fn load_intraday<F, K>(
        &self,
        source: &F,
        sink: &K,
        now: DateTime<Utc>,
    ) -> Result<StreamReport, PipelineError>
    where
        F: FitnessSource,
        K: SeriesSink,
    {
        let stream = MetricStream::IntradayHeart;
        let spec = stream.spec();
        let mut report = StreamReport::new(stream);

        for day in self.intraday_days(now) {
            info!("Loading: {}", day.format(crate::DATE_FORMAT));

            let series = source
                .fetch_intraday_heart(day)
                .await
                .map_err(|e| fetch_error(stream, e))?;

            let samples = series.normalize(self.config.timezone);
            let dropped = series.len() - samples.len();
            if dropped > 0 {
                warn!(
                    "Dropped {} samples on {} with no matching instant in {}",
                    dropped, day, self.config.timezone
                );
                report.skipped += dropped;
            }

            let mut batch = Batch::new(&self.config.database, self.config.precision);
            for sample in samples {
                let point = spec
                    .point(FieldValue::Integer(sample.value), sample.timestamp)
                    .map_err(|source| PipelineError::Point { stream, source })?;
                batch.add_point(point);
            }

            report.points += batch.len();
            write_batch(stream, sink, batch).await?;
            report.batches += 1;
        }

        Ok(report)
    }
}

fn fetch_error<E>(stream: MetricStream, err: E) -> PipelineError
where
    E: std::error::Error + Send + Sync + 'static,
{
    PipelineError::Fetch {
        stream,
        source: Box::new(err),
    }
}

async fn write_batch<K: SeriesSink>(
    stream: MetricStream,
    sink: &K,
    batch: Batch,
) -> Result<(), PipelineError> {
    sink.write(batch)
        .await
        .map_err(|e| PipelineError::Write {
            stream,
            source: Box::new(e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fitflux_types::{HeartValue, RestingHeartRecord, StepRecord, WeightRecord};

    use crate::RetentionWindow;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap()
    }

    fn pipeline(days: u32) -> Pipeline {
        Pipeline::new(
            PipelineConfig::builder()
                .window(RetentionWindow::days(days))
                .build(),
        )
    }

    fn steps(date: &str, value: i64) -> StepRecord {
        StepRecord {
            date: date.to_string(),
            value,
        }
    }

    #[test]
    fn test_recent_steps_are_kept() {
        let (batch, skipped) = pipeline(30)
            .build_daily_batch(MetricStream::Steps, &[steps("2024-06-20", 5000)], now())
            .unwrap();

        assert_eq!(skipped, 0);
        assert_eq!(batch.len(), 1);
        let point = &batch.points()[0];
        assert_eq!(point.measurement(), "activity_steps");
        assert_eq!(
            point.tags().get("steps").map(String::as_str),
            Some("steps-total")
        );
        assert_eq!(point.field("steps"), Some(FieldValue::Integer(5000)));
        assert_eq!(
            point.timestamp(),
            Utc.with_ymd_and_hms(2024, 6, 20, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_old_weight_is_skipped() {
        let records = [WeightRecord {
            date: "2024-06-20".to_string(),
            value: 72.0,
        }];
        let (batch, skipped) = pipeline(7)
            .build_daily_batch(MetricStream::Weight, &records, now())
            .unwrap();

        assert!(batch.is_empty());
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_resting_heart_today() {
        let records = [RestingHeartRecord {
            date: "2024-06-30".to_string(),
            value: HeartValue {
                resting_heart_rate: 52,
            },
        }];
        let (batch, _) = pipeline(30)
            .build_daily_batch(MetricStream::RestingHeart, &records, now())
            .unwrap();

        let point = &batch.points()[0];
        assert_eq!(point.measurement(), "heart");
        assert_eq!(
            point.tags().get("heart").map(String::as_str),
            Some("resting-heart")
        );
        assert_eq!(point.field("resting"), Some(FieldValue::Integer(52)));
    }

    #[test]
    fn test_missing_resting_rate_writes_zero() {
        let records = [RestingHeartRecord {
            date: "2024-06-30".to_string(),
            value: HeartValue::default(),
        }];
        let (batch, skipped) = pipeline(30)
            .build_daily_batch(MetricStream::RestingHeart, &records, now())
            .unwrap();

        assert_eq!(batch.len(), 1);
        assert_eq!(skipped, 0);
        assert_eq!(
            batch.points()[0].field("resting"),
            Some(FieldValue::Integer(0))
        );
    }

    #[test]
    fn test_malformed_date_fails_batch() {
        let records = [steps("2024-06-20", 1), steps("June 21", 2)];
        let err = pipeline(30)
            .build_daily_batch(MetricStream::Steps, &records, now())
            .unwrap_err();

        match err {
            PipelineError::Parse { stream, value, .. } => {
                assert_eq!(stream, MetricStream::Steps);
                assert_eq!(value, "June 21");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_points_keep_record_order() {
        let records = [
            steps("2024-06-29", 3),
            steps("2024-01-01", 0),
            steps("2024-06-27", 1),
        ];
        let (batch, skipped) = pipeline(30)
            .build_daily_batch(MetricStream::Steps, &records, now())
            .unwrap();

        let values: Vec<_> = batch
            .points()
            .iter()
            .filter_map(|p| p.field("steps"))
            .collect();
        assert_eq!(
            values,
            vec![FieldValue::Integer(3), FieldValue::Integer(1)]
        );
        assert_eq!(skipped, 1);
    }

    #[test]
    fn test_intraday_days() {
        let days = pipeline(3).intraday_days(now());
        assert_eq!(
            days,
            vec![
                NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 29).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            ]
        );
        assert!(pipeline(0).intraday_days(now()).is_empty());
    }

    #[test]
    fn test_intraday_today_follows_timezone() {
        // 23:30 UTC on the 30th is already the 1st in Tokyo.
        let late = Utc.with_ymd_and_hms(2024, 6, 30, 23, 30, 0).unwrap();
        let pipeline = Pipeline::new(
            PipelineConfig::builder()
                .window(RetentionWindow::days(1))
                .timezone(chrono_tz::Asia::Tokyo)
                .build(),
        );
        assert_eq!(
            pipeline.intraday_days(late),
            vec![NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()]
        );
    }

    #[test]
    fn test_run_report_totals() {
        let report = RunReport {
            streams: vec![
                StreamReport {
                    stream: MetricStream::Steps,
                    points: 3,
                    skipped: 1,
                    batches: 1,
                },
                StreamReport {
                    stream: MetricStream::IntradayHeart,
                    points: 10,
                    skipped: 0,
                    batches: 2,
                },
            ],
        };
        assert_eq!(report.total_points(), 13);
        assert_eq!(report.total_batches(), 3);
        assert_eq!(report.get(MetricStream::Steps).map(|r| r.skipped), Some(1));
        assert!(report.get(MetricStream::Weight).is_none());
    }
}
