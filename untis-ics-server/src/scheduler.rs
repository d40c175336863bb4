use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use untis_ics_core::generator::CalendarGenerator;

/// Regenerate the feed now and then every `interval`.
/// A slow cycle delays the next tick instead of overlapping it.
pub fn spawn(generator: Arc<CalendarGenerator>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // The first tick completes immediately
            ticker.tick().await;
            run_cycle(&generator).await;
        }
    })
}

/// One generation cycle; failures are logged and the previous feed stays published
pub async fn run_cycle(generator: &CalendarGenerator) -> bool {
    match generator.generate().await {
        Ok(report) => {
            tracing::info!(
                "Scheduled update finished: {} lessons, {} events",
                report.lessons,
                report.events
            );
            true
        }
        Err(e) => {
            tracing::error!("Scheduled update failed, keeping previous feed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use untis_ics_core::{
        Error, RawLesson, Result, generator::FeedStore, ics::IcsGenerator,
        providers::LessonSource, window::DateWindow,
    };

    use super::*;

    /// Counts fetches and records the highest number running at once
    #[derive(Default)]
    struct CountingSource {
        calls: AtomicUsize,
        running: AtomicUsize,
        max_running: AtomicUsize,
        fail: bool,
        delay: Duration,
    }

    #[async_trait]
    impl LessonSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn description(&self) -> &str {
            "Counts fetches"
        }

        async fn validate(&self) -> Result<()> {
            Ok(())
        }

        async fn fetch_lessons(&self, _: DateWindow) -> Result<Vec<RawLesson>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(running, Ordering::SeqCst);
            time::sleep(self.delay).await;
            self.running.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                Err(Error::Timeout)
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn generator(source: Arc<CountingSource>) -> Arc<CalendarGenerator> {
        Arc::new(CalendarGenerator::new(
            source,
            IcsGenerator::default(),
            Arc::new(FeedStore::in_memory()),
        ))
    }

    #[tokio::test]
    async fn failed_cycle_keeps_previous_feed() {
        let generator = generator(Arc::new(CountingSource {
            fail: true,
            ..Default::default()
        }));
        let before = generator
            .store()
            .publish("BEGIN:VCALENDAR\r\nEND:VCALENDAR\r\n".to_string(), Utc::now())
            .await
            .unwrap();

        assert!(!run_cycle(&generator).await);
        assert_eq!(generator.store().current().await.unwrap(), before);
    }

    #[tokio::test]
    async fn successful_cycle_publishes_feed() {
        let generator = generator(Arc::new(CountingSource::default()));

        assert!(run_cycle(&generator).await);
        let snapshot = generator.store().current().await.unwrap();
        assert!(snapshot.body.starts_with("BEGIN:VCALENDAR\r\n"));
    }

    #[tokio::test]
    async fn runs_immediately_then_repeats_without_overlap() {
        let source = Arc::new(CountingSource {
            delay: Duration::from_millis(30),
            ..Default::default()
        });
        let handle = spawn(generator(source.clone()), Duration::from_millis(10));

        time::sleep(Duration::from_millis(200)).await;
        handle.abort();

        assert!(source.calls.load(Ordering::SeqCst) >= 2);
        assert_eq!(source.max_running.load(Ordering::SeqCst), 1);
    }
}
