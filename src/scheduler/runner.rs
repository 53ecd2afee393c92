//! The acquisition loop.
//!
//! [`Harvester`] walks the keyword list inside human-paced sessions,
//! wraps every query in the retry policy and appends whatever comes back
//! to the raw sink as it arrives.

use std::time::Duration;

use postsift_filter::RawRecord;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::SiftConfig;
use crate::error::{Result, SiftError};
use crate::sink::RawSink;
use crate::source::PostSource;

use super::retry::{QueryOutcome, RetryPolicy, run_with_retry};
use super::session::{Pause, Session, long_pause, secs};
use super::sleep_or_cancel;
use super::variation::{Variant, vary_keyword};

/// Why a run stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StopReason {
    /// Every requested pass finished.
    #[default]
    Completed,
    /// The cancellation token fired.
    Interrupted,
    /// The configured session ceiling was reached.
    SessionBudgetExhausted,
    /// Appending to the raw sink failed; earlier lines are intact.
    SinkFailed(String),
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Interrupted => write!(f, "interrupted"),
            Self::SessionBudgetExhausted => write!(f, "session budget exhausted"),
            Self::SinkFailed(e) => write!(f, "sink failed: {e}"),
        }
    }
}

/// Counters for one acquisition run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub queries_attempted: usize,
    pub queries_succeeded: usize,
    /// Queries given up on after repeated rate limiting.
    pub queries_abandoned: usize,
    /// Queries that failed for any other reason.
    pub queries_failed: usize,
    pub records_written: usize,
    pub sessions_started: u32,
    pub stop_reason: StopReason,
}

/// Drives a [`PostSource`] under the session, pacing and retry policy.
pub struct Harvester<S, C> {
    source: S,
    clock: C,
    config: SiftConfig,
    retry: RetryPolicy,
    rng: StdRng,
    cancel: CancellationToken,
}

impl<S: PostSource, C: Clock> Harvester<S, C> {
    /// Build a harvester. The RNG is seeded from `acquisition.seed` when
    /// set, otherwise from entropy.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::Config`] if `config` fails validation.
    pub fn new(source: S, clock: C, config: SiftConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.acquisition.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            source,
            clock,
            retry: RetryPolicy::from(&config.retry),
            config,
            rng,
            cancel: CancellationToken::new(),
        })
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancel_token(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that stops the run at its next suspension point.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &SiftConfig {
        &self.config
    }

    /// Walk the keyword list for the configured number of passes.
    ///
    /// Recoverable conditions (rate limits, query failures, interruption,
    /// sink failures) end up in the returned report, never as errors.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::Precondition`] if there are no keywords, or an
    /// I/O error if the raw sink cannot be opened.
    pub async fn run(&mut self) -> Result<RunReport> {
        let keywords = self.config.acquisition.keywords.clone();
        if keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(SiftError::Precondition("no keywords configured".into()));
        }
        let mut sink = RawSink::open(&self.config.output.raw_path)?;
        let mut report = RunReport::default();

        info!(
            keywords = keywords.len(),
            passes = self.config.acquisition.passes,
            out = %sink.path().display(),
            "starting keyword acquisition"
        );

        report.stop_reason = match self.drive(&keywords, &mut sink, &mut report).await {
            Ok(()) => StopReason::Completed,
            Err(stop) => stop,
        };

        info!(
            attempted = report.queries_attempted,
            succeeded = report.queries_succeeded,
            abandoned = report.queries_abandoned,
            failed = report.queries_failed,
            written = report.records_written,
            sessions = report.sessions_started,
            stop = %report.stop_reason,
            "acquisition finished"
        );
        Ok(report)
    }

    /// Fetch one user's recent posts: a single retried query, no pacing.
    ///
    /// # Errors
    ///
    /// Returns [`SiftError::Precondition`] for an empty user id, or an I/O
    /// error if the raw sink cannot be opened.
    pub async fn collect_user_timeline(&mut self, user_id: &str) -> Result<RunReport> {
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(SiftError::Precondition("user id must not be empty".into()));
        }
        let mut sink = RawSink::open(&self.config.output.raw_path)?;
        let mut report = RunReport {
            queries_attempted: 1,
            ..RunReport::default()
        };

        info!(user_id, "fetching user timeline");
        let source = &self.source;
        let outcome = run_with_retry(
            &self.retry,
            &self.clock,
            &mut self.rng,
            &self.cancel,
            user_id,
            || source.user_timeline(user_id),
        )
        .await;

        report.stop_reason = match outcome {
            QueryOutcome::Completed(records) => {
                report.queries_succeeded = 1;
                info!(user_id, found = records.len(), "user timeline fetched");
                match append_all(&mut sink, records, &mut report) {
                    Ok(()) => StopReason::Completed,
                    Err(stop) => stop,
                }
            }
            QueryOutcome::Abandoned { .. } => {
                report.queries_abandoned = 1;
                StopReason::Completed
            }
            QueryOutcome::Failed(_) => {
                report.queries_failed = 1;
                StopReason::Completed
            }
            QueryOutcome::Cancelled => StopReason::Interrupted,
        };
        Ok(report)
    }

    async fn drive(
        &mut self,
        keywords: &[String],
        sink: &mut RawSink,
        report: &mut RunReport,
    ) -> std::result::Result<(), StopReason> {
        let passes = self.config.acquisition.passes;
        let mut session = self.start_session(report);
        let mut pass = 0u32;
        let last_index = keywords.iter().rposition(|k| !k.trim().is_empty());

        loop {
            if passes != 0 && pass >= passes {
                return Ok(());
            }
            debug!(pass = pass + 1, "starting pass over keywords");

            for (index, keyword) in keywords.iter().enumerate() {
                if keyword.trim().is_empty() {
                    continue;
                }
                self.ensure_session(&mut session, report).await?;
                self.query_keyword(keyword, sink, report).await?;

                let final_query =
                    passes != 0 && pass + 1 == passes && Some(index) == last_index;
                if !final_query {
                    self.pause_after_query(&mut session).await?;
                }
            }
            pass = pass.saturating_add(1);
        }
    }

    /// Replace an expired session, honouring the session ceiling and the
    /// long pause between sessions.
    async fn ensure_session(
        &mut self,
        session: &mut Session,
        report: &mut RunReport,
    ) -> std::result::Result<(), StopReason> {
        while !session.should_continue(self.clock.now()) {
            session.end();
            info!(sessions = report.sessions_started, "session ended");

            let sessions = report.sessions_started;
            if self
                .config
                .acquisition
                .max_sessions
                .is_some_and(|max| sessions >= max)
            {
                return Err(StopReason::SessionBudgetExhausted);
            }

            let pause = long_pause(&self.config.session, &mut self.rng);
            info!(
                minutes = pause.as_secs_f64() / 60.0,
                "pausing before the next session"
            );
            self.wait(pause).await?;
            *session = self.start_session(report);
        }
        if self.cancel.is_cancelled() {
            return Err(StopReason::Interrupted);
        }
        Ok(())
    }

    async fn query_keyword(
        &mut self,
        keyword: &str,
        sink: &mut RawSink,
        report: &mut RunReport,
    ) -> std::result::Result<(), StopReason> {
        let (term, variant) = vary_keyword(keyword, &self.config.variation, &mut self.rng);
        if variant != Variant::Unchanged {
            debug!(keyword, term = %term, ?variant, "varied query term");
        }

        report.queries_attempted += 1;
        let sort = self.config.acquisition.sort_mode;
        let source = &self.source;
        let query = term.as_str();
        let outcome = run_with_retry(
            &self.retry,
            &self.clock,
            &mut self.rng,
            &self.cancel,
            query,
            move || source.search(query, sort),
        )
        .await;

        match outcome {
            QueryOutcome::Completed(records) => {
                report.queries_succeeded += 1;
                info!(keyword, term = %term, found = records.len(), "search complete");
                self.store(keyword, records, sink, report).await
            }
            QueryOutcome::Abandoned { attempts } => {
                report.queries_abandoned += 1;
                warn!(keyword, attempts, "keyword skipped after repeated rate limiting");
                Ok(())
            }
            QueryOutcome::Failed(err) => {
                report.queries_failed += 1;
                warn!(keyword, error = %err, "keyword skipped");
                Ok(())
            }
            QueryOutcome::Cancelled => Err(StopReason::Interrupted),
        }
    }

    /// Tag and append one result page, with a short pause between records.
    async fn store(
        &mut self,
        keyword: &str,
        records: Vec<RawRecord>,
        sink: &mut RawSink,
        report: &mut RunReport,
    ) -> std::result::Result<(), StopReason> {
        for (index, mut record) in records.into_iter().enumerate() {
            if index > 0 {
                let pause = secs(self.config.acquisition.micro_pause_secs.sample(&mut self.rng));
                self.wait(pause).await?;
            }
            record.source_keyword = Some(keyword.to_owned());
            append_one(sink, &record, report)?;
        }
        Ok(())
    }

    async fn pause_after_query(
        &mut self,
        session: &mut Session,
    ) -> std::result::Result<(), StopReason> {
        let pause = session.next_pause(&mut self.rng);
        match pause {
            Pause::Break(duration) => {
                info!(
                    secs = duration.as_secs_f64(),
                    profile = %session.profile(),
                    "taking a break"
                );
                self.wait(duration).await?;
                session.resume();
            }
            Pause::Delay { distraction, .. } => {
                if let Some(extra) = distraction {
                    info!(secs = extra.as_secs_f64(), "simulating a distraction");
                }
                debug!(
                    secs = pause.duration().as_secs_f64(),
                    "waiting before the next search"
                );
                self.wait(pause.duration()).await?;
            }
        }
        Ok(())
    }

    fn start_session(&mut self, report: &mut RunReport) -> Session {
        let session = Session::start(&self.config.session, self.clock.now(), &mut self.rng);
        report.sessions_started += 1;
        info!(
            profile = %session.profile(),
            minutes = session.max_duration_minutes(),
            multiplier = session.multiplier(),
            "new session started"
        );
        session
    }

    async fn wait(&self, duration: Duration) -> std::result::Result<(), StopReason> {
        if sleep_or_cancel(&self.clock, &self.cancel, duration).await {
            Ok(())
        } else {
            info!("interrupted, stopping acquisition");
            Err(StopReason::Interrupted)
        }
    }
}

fn append_one(
    sink: &mut RawSink,
    record: &RawRecord,
    report: &mut RunReport,
) -> std::result::Result<(), StopReason> {
    match sink.append(record) {
        Ok(()) => {
            report.records_written += 1;
            Ok(())
        }
        Err(e) => {
            error!(path = %sink.path().display(), error = %e, "failed to append record");
            Err(StopReason::SinkFailed(e.to_string()))
        }
    }
}

fn append_all(
    sink: &mut RawSink,
    records: Vec<RawRecord>,
    report: &mut RunReport,
) -> std::result::Result<(), StopReason> {
    records
        .iter()
        .try_for_each(|record| append_one(sink, record, report))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::clock::ManualClock;
    use crate::source::ReplaySource;

    fn quiet_config(dir: &std::path::Path) -> SiftConfig {
        let mut config = SiftConfig::default();
        config.output.raw_path = dir.join("posts.jsonl");
        config.acquisition.keywords = vec!["defi".into(), "zk".into()];
        config.acquisition.seed = Some(1);
        config.variation.qualifier_probability = 0.0;
        config.variation.suffix_probability = 0.0;
        config.variation.typo_probability = 0.0;
        config
    }

    #[test]
    fn invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quiet_config(dir.path());
        config.retry.max_retries = 0;
        let result = Harvester::new(ReplaySource::default(), ManualClock::default(), config);
        assert!(matches!(result, Err(SiftError::Config(_))));
    }

    #[tokio::test]
    async fn empty_keyword_list_is_a_precondition_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = quiet_config(dir.path());
        config.acquisition.keywords = vec!["  ".into()];
        let mut harvester =
            Harvester::new(ReplaySource::default(), ManualClock::default(), config).unwrap();
        assert!(matches!(
            harvester.run().await,
            Err(SiftError::Precondition(_))
        ));
    }

    #[tokio::test]
    async fn records_are_tagged_with_the_original_keyword() {
        let dir = tempfile::tempdir().unwrap();
        let config = quiet_config(dir.path());
        let raw_path = config.output.raw_path.clone();
        let source = ReplaySource::new(vec![
            RawRecord::new("1", "DeFi lending exploit"),
            RawRecord::new("2", "zk rollup sdk release"),
        ]);
        let mut harvester = Harvester::new(source, ManualClock::default(), config).unwrap();

        let report = harvester.run().await.unwrap();
        assert_eq!(report.stop_reason, StopReason::Completed);
        assert_eq!(report.queries_attempted, 2);
        assert_eq!(report.records_written, 2);

        let (records, _) = crate::sink::read_records(&raw_path).unwrap();
        assert_eq!(records[0].source_keyword.as_deref(), Some("defi"));
        assert_eq!(records[1].source_keyword.as_deref(), Some("zk"));
    }

    #[tokio::test]
    async fn cancelled_before_start_issues_no_queries() {
        let dir = tempfile::tempdir().unwrap();
        let config = quiet_config(dir.path());
        let mut harvester =
            Harvester::new(ReplaySource::default(), ManualClock::default(), config).unwrap();
        harvester.cancel_token().cancel();

        let report = harvester.run().await.unwrap();
        assert_eq!(report.stop_reason, StopReason::Interrupted);
        assert_eq!(report.queries_attempted, 0);
    }

    #[test]
    fn stop_reason_display() {
        assert_eq!(StopReason::Completed.to_string(), "completed");
        assert_eq!(
            StopReason::SinkFailed("disk full".into()).to_string(),
            "sink failed: disk full"
        );
    }
}
