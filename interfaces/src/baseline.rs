use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::warn;

use crate::defs::NotificationSink;
use crate::defs::PreferenceStore;
use crate::defs::SourceFailureNotice;
use crate::defs::UserPreferences;

/// Logs every failure notice and keeps a copy so callers can show them later.
#[derive(Default)]
pub struct RecordingNotificationSink {
    notices: Mutex<Vec<SourceFailureNotice>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<SourceFailureNotice> {
        match self.notices.lock() {
            Ok(notices) => notices.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn notify(&self, notice: SourceFailureNotice) {
        warn!("{}: {}", notice.source.label(), notice.message);
        match self.notices.lock() {
            Ok(mut notices) => notices.push(notice),
            Err(poisoned) => poisoned.into_inner().push(notice),
        }
    }
}

/// Preferences that live only as long as the process.
pub struct InMemoryPreferenceStore {
    tx: watch::Sender<UserPreferences>,
}

impl InMemoryPreferenceStore {
    pub fn new(initial: UserPreferences) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }
}

impl Default for InMemoryPreferenceStore {
    fn default() -> Self {
        Self::new(UserPreferences::default())
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
    async fn load(&self) -> Result<UserPreferences> {
        Ok(self.tx.borrow().clone())
    }

    async fn save(&self, preferences: &UserPreferences) -> Result<()> {
        self.tx.send_replace(preferences.clone());
        Ok(())
    }

    fn subscribe(&self) -> watch::Receiver<UserPreferences> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::NewsSource;

    #[tokio::test]
    async fn save_publishes_to_subscribers() {
        let store = InMemoryPreferenceStore::default();
        let mut rx = store.subscribe();
        let prefs = UserPreferences {
            sources: vec![NewsSource::Guardian],
            categories: vec!["technology".to_owned()],
            authors: vec![],
        };
        store.save(&prefs).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), prefs);
        assert_eq!(store.load().await.unwrap(), prefs);
    }

    #[test]
    fn recording_sink_keeps_notices_in_order() {
        let sink = RecordingNotificationSink::new();
        sink.notify(SourceFailureNotice { source: NewsSource::Nyt, message: "a".to_owned() });
        sink.notify(SourceFailureNotice { source: NewsSource::NewsApi, message: "b".to_owned() });
        let sources: Vec<_> = sink.notices().into_iter().map(|n| n.source).collect();
        assert_eq!(sources, vec![NewsSource::Nyt, NewsSource::NewsApi]);
    }
}
