//! Timers for the background jobs.
//!
//! Both the expiry sweep and the propagation worker run on a fixed interval.
//! A job can be anchored to a point in time so that its runs line up with the
//! wall clock; runs that would have happened before startup are skipped.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::{Instrument as _, Level, event, span};

/// When to run a periodic job.
///
/// A job with no interval is disabled.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Scheduler {
    /// An RFC3339 timestamp to align runs to (if omitted, runs start now)
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub from: Option<time::OffsetDateTime>,
    /// How often to run the job
    #[serde(default, with = "humantime_serde::option")]
    pub every: Option<Duration>,
}

impl Scheduler {
    /// Whether the job runs at all
    pub fn is_enabled(&self) -> bool {
        self.every.is_some()
    }

    /// The first run at or after `now`
    fn first_run(&self, now: OffsetDateTime, delta: Duration) -> OffsetDateTime {
        match self.from {
            Some(mut from) if from < now => {
                let skipped = ((now - from) / delta).ceil() as u32;
                from += delta * skipped;
                from
            }
            Some(from) => from,
            None => now,
        }
    }

    /// Run `f` on every tick until it fails.
    ///
    /// Each run happens inside an INFO span named after the job, and receives
    /// the scheduled time of the run.
    ///
    /// # Returns
    ///
    /// * `Ok(())` immediately if the job is disabled
    /// * `Err(E)` with the first error `f` returns
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    /// use bhserver::Scheduler;
    ///
    /// # fn main() -> Result<(), String> {
    /// let scheduler = Scheduler {
    ///     from: None,
    ///     every: Some(Duration::from_secs(60)),
    /// };
    ///
    /// # tokio_test::block_on(async {
    /// scheduler.schedule("expiry sweep", |at| async move {
    ///     println!("sweeping at {at}");
    ///     Ok::<(), String>(())
    /// }).await?;
    /// # Ok(())
    /// # })
    /// # }
    /// ```
    pub async fn schedule<T, E>(
        &self,
        job: &'static str,
        f: impl AsyncFn(OffsetDateTime) -> Result<T, E>,
    ) -> Result<(), E> {
        let Some(delta) = self.every else {
            return Ok(());
        };

        let now = OffsetDateTime::now_utc();
        let mut anchor = self.first_run(now, delta);

        let wait: Duration = (anchor - now).try_into().unwrap_or(Duration::ZERO);
        tokio::time::sleep(wait).await;

        let mut interval = tokio::time::interval(delta);
        loop {
            interval.tick().await;

            let span = span!(Level::INFO, "scheduled job", job);
            async {
                event!(
                    Level::INFO,
                    run_at = anchor
                        .format(&Rfc3339)
                        .unwrap_or_else(|_| anchor.to_string()),
                );
                f(anchor).await
            }
            .instrument(span)
            .await?;

            anchor += delta;
        }
    }
}

/// The propagation worker's settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PropagationConfig {
    /// How often to retry pending replica writes; disabled if omitted
    #[serde(default, with = "humantime_serde::option")]
    pub every: Option<Duration>,
    /// The most outbox entries handled per run
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Failed attempts before an entry is given up on
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_batch_size() -> usize {
    50
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            every: Some(Duration::from_secs(15)),
            batch_size: default_batch_size(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PropagationConfig {
    /// The worker's timer
    pub fn scheduler(&self) -> Scheduler {
        Scheduler {
            from: None,
            every: self.every,
        }
    }
}
