//! One generation cycle: fetch, map, merge, encode, publish.
//!
//! The published feed lives in a [`FeedStore`] as a single
//! [`FeedSnapshot`]. Readers always see a body together with the timestamp it
//! was generated at, and a failed cycle never replaces what is already there.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::SystemTime,
};

use chrono::{DateTime, SubsecRound, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::{
    Error, Result,
    ics::IcsGenerator,
    mapper::map_lessons,
    merger::merge_consecutive,
    providers::LessonSource,
    window::{DEFAULT_WINDOW_MONTHS, DateWindow},
};

/// The feed currently being served
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub body: String,
    /// Whole seconds, as HTTP dates carry no fractions
    pub last_modified: DateTime<Utc>,
}

/// Holds the current snapshot and mirrors it to disk
#[derive(Debug, Default)]
pub struct FeedStore {
    path: Option<PathBuf>,
    current: RwLock<Option<Arc<FeedSnapshot>>>,
}

impl FeedStore {
    /// A store that keeps the feed in memory only
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A store that also writes every published feed to `path`
    pub fn with_file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            current: RwLock::new(None),
        }
    }

    pub async fn current(&self) -> Option<Arc<FeedSnapshot>> {
        self.current.read().await.clone()
    }

    /// Serve a feed left on disk by a previous run, dated by its mtime.
    ///
    /// Returns whether a file was found.
    pub async fn load_existing(&self) -> Result<bool> {
        let Some(path) = self.path.as_deref() else {
            return Ok(false);
        };
        if !tokio::fs::try_exists(path).await? {
            return Ok(false);
        }

        let body = tokio::fs::read_to_string(path).await?;
        let modified = tokio::fs::metadata(path)
            .await?
            .modified()
            .unwrap_or_else(|_| SystemTime::now());

        let snapshot = FeedSnapshot {
            body,
            last_modified: DateTime::<Utc>::from(modified).trunc_subsecs(0),
        };
        tracing::info!(
            "Loaded existing feed from {} (last modified {})",
            path.display(),
            snapshot.last_modified
        );
        *self.current.write().await = Some(Arc::new(snapshot));

        Ok(true)
    }

    /// Persist `body`, then make it the current snapshot.
    ///
    /// If writing the file fails the previous snapshot stays in place.
    pub async fn publish(&self, body: String, at: DateTime<Utc>) -> Result<Arc<FeedSnapshot>> {
        if let Some(path) = self.path.as_deref() {
            write_atomically(path, &body).await?;
        }

        let snapshot = Arc::new(FeedSnapshot {
            body,
            last_modified: at.trunc_subsecs(0),
        });
        *self.current.write().await = Some(snapshot.clone());

        Ok(snapshot)
    }
}

/// Write to a sibling temp file and rename it over `path`
async fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Config(format!("feed path {} is not a file", path.display())))?;
    let mut temp_name = file_name.to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    tokio::fs::write(&temp_path, contents).await?;
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }

    Ok(())
}

/// Outcome of a successful cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReport {
    /// Non-cancelled lessons fetched
    pub lessons: usize,
    /// Events written after merging
    pub events: usize,
    pub bytes: usize,
    pub generated_at: DateTime<Utc>,
}

/// Turns the backend timetable into the published feed
pub struct CalendarGenerator {
    source: Arc<dyn LessonSource>,
    encoder: IcsGenerator,
    store: Arc<FeedStore>,
    window_months: u32,
    cycle: Mutex<()>,
}

impl CalendarGenerator {
    pub fn new(source: Arc<dyn LessonSource>, encoder: IcsGenerator, store: Arc<FeedStore>) -> Self {
        Self {
            source,
            encoder,
            store,
            window_months: DEFAULT_WINDOW_MONTHS,
            cycle: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_window_months(mut self, months: u32) -> Self {
        self.window_months = months;
        self
    }

    pub fn store(&self) -> &Arc<FeedStore> {
        &self.store
    }

    /// Run one cycle over the window around today
    pub async fn generate(&self) -> Result<GenerationReport> {
        self.generate_for(DateWindow::around_today(self.window_months))
            .await
    }

    /// Run one cycle over `window`. Concurrent calls run one after another.
    pub async fn generate_for(&self, window: DateWindow) -> Result<GenerationReport> {
        let _cycle = self.cycle.lock().await;

        tracing::info!(
            "Generating calendar feed from {} for {} - {}",
            self.source.name(),
            window.start,
            window.end
        );

        let lessons = self.source.fetch_lessons(window).await?;
        let events = merge_consecutive(map_lessons(&lessons));
        tracing::debug!(
            "Mapped {} lessons into {} events",
            lessons.len(),
            events.len()
        );

        let generated_at = Utc::now();
        let body = self.encoder.generate(&events, generated_at)?;
        let bytes = body.len();
        let snapshot = self.store.publish(body, generated_at).await?;

        tracing::info!(
            "Calendar feed updated: {} events, {} bytes, last modified {}",
            events.len(),
            bytes,
            snapshot.last_modified
        );

        Ok(GenerationReport {
            lessons: lessons.len(),
            events: events.len(),
            bytes,
            generated_at: snapshot.last_modified,
        })
    }
}
