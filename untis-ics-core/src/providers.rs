pub mod base;
pub mod webuntis;

use async_trait::async_trait;

use crate::{RawLesson, Result, window::DateWindow};

pub use base::*;

/// A timetable backend reached through a login session
#[async_trait]
pub trait Provider: Send + Sync {
    /// Session data returned by a successful login
    type Session: Send + Sync;

    /// Provider name
    fn name(&self) -> &str;

    /// Provider description
    fn description(&self) -> &str;

    /// Log in and open a session
    async fn authenticate(&self) -> Result<Self::Session>;

    /// All lessons of the session's own timetable inside `window`, cancelled ones included
    async fn get_lessons(&self, session: &Self::Session, window: DateWindow)
    -> Result<Vec<RawLesson>>;

    /// Close the session
    async fn logout(&self, session: &Self::Session) -> Result<()>;
}

/// The "fetch lessons for a date window" capability the generator consumes
#[async_trait]
pub trait LessonSource: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Check that the configured credentials are accepted
    async fn validate(&self) -> Result<()>;

    /// Non-cancelled lessons in `window`, sorted by date and start time
    async fn fetch_lessons(&self, window: DateWindow) -> Result<Vec<RawLesson>>;
}

/// Runs a [`Provider`] as one login, query, logout sequence per fetch
pub struct Wrapper<P: Provider> {
    provider: P,
}

impl<P: Provider> Wrapper<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Logout failures are logged rather than returned; the data is already in hand
    async fn close(&self, session: &P::Session) {
        if let Err(e) = self.provider.logout(session).await {
            tracing::warn!("Logout from {} failed: {}", self.provider.name(), e);
        }
    }
}

#[async_trait]
impl<P: Provider> LessonSource for Wrapper<P> {
    fn name(&self) -> &str {
        self.provider.name()
    }

    fn description(&self) -> &str {
        self.provider.description()
    }

    async fn validate(&self) -> Result<()> {
        let session = self.provider.authenticate().await?;
        self.close(&session).await;
        Ok(())
    }

    async fn fetch_lessons(&self, window: DateWindow) -> Result<Vec<RawLesson>> {
        let session = self.provider.authenticate().await?;
        let result = self.provider.get_lessons(&session, window).await;
        self.close(&session).await;

        let mut lessons = result?;
        let total = lessons.len();
        lessons.retain(|lesson| !lesson.is_cancelled());
        lessons.sort_by_key(|lesson| (lesson.date, lesson.start_time, lesson.end_time));

        tracing::info!(
            "Fetched {} lessons from {} ({} cancelled) for {} - {}",
            lessons.len(),
            self.provider.name(),
            total - lessons.len(),
            window.start,
            window.end
        );

        Ok(lessons)
    }
}
