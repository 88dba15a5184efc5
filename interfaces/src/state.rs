use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;

use crate::defs::PreferenceStore;
use crate::defs::UserPreferences;

/// Preferences persisted as a single JSON document.
///
/// A missing file reads as the defaults; it is created on the first save.
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    tx: watch::Sender<UserPreferences>,
}

impl JsonFilePreferenceStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let initial = read_preferences(&path).await?;
        let (tx, _rx) = watch::channel(initial);
        Ok(Self { path, tx })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn read_preferences(path: &Path) -> Result<UserPreferences> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let preferences = serde_json::from_str(&text)
                .with_context(|| format!("parsing preferences from {}", path.display()))?;
            debug!("Loaded preferences from {}", path.display());
            Ok(preferences)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No preferences at {}, using defaults", path.display());
            Ok(UserPreferences::default())
        }
        Err(e) => Err(e).with_context(|| format!("reading preferences from {}", path.display())),
    }
}

#[async_trait]
impl PreferenceStore for JsonFilePreferenceStore {
    async fn load(&self) -> Result<UserPreferences> {
        Ok(self.tx.borrow().clone())
    }

    async fn save(&self, preferences: &UserPreferences) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let text = serde_json::to_string_pretty(preferences)?;
        tokio::fs::write(&self.path, text)
            .await
            .with_context(|| format!("writing preferences to {}", self.path.display()))?;
        info!("Saved preferences to {}", self.path.display());
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

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("news-prefs-{}-{}", std::process::id(), name))
            .join("preferences.json")
    }

    #[tokio::test]
    async fn missing_file_reads_as_defaults() {
        let store = JsonFilePreferenceStore::open(scratch_path("missing")).await.unwrap();
        assert_eq!(store.load().await.unwrap(), UserPreferences::default());
    }

    #[tokio::test]
    async fn saved_preferences_survive_reopen() {
        let path = scratch_path("reopen");
        let prefs = UserPreferences {
            sources: vec![NewsSource::Nyt, NewsSource::Guardian],
            categories: vec!["science".to_owned()],
            authors: vec!["Jane Doe".to_owned()],
        };
        let store = JsonFilePreferenceStore::open(&path).await.unwrap();
        store.save(&prefs).await.unwrap();

        let reopened = JsonFilePreferenceStore::open(&path).await.unwrap();
        assert_eq!(reopened.load().await.unwrap(), prefs);
        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }

    #[tokio::test]
    async fn partial_document_fills_in_defaults() {
        let path = scratch_path("partial");
        tokio::fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        tokio::fs::write(&path, r#"{"categories":["world"]}"#).await.unwrap();

        let store = JsonFilePreferenceStore::open(&path).await.unwrap();
        let prefs = store.load().await.unwrap();
        assert_eq!(prefs.sources, NewsSource::ALL.to_vec());
        assert_eq!(prefs.categories, vec!["world".to_owned()]);
        let _ = tokio::fs::remove_dir_all(path.parent().unwrap()).await;
    }
}
