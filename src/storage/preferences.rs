use std::{
    fmt::Display,
    future::Future,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use fs4::tokio::AsyncFileExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, error};

use crate::usage::{
    challenges::ActiveChallenge,
    goals::{default_goals, Goal},
};

const GOALS_FILE: &str = "goals.json";
const CHALLENGES_FILE: &str = "active_challenges.json";
const THEME_FILE: &str = "theme.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn toggle(self) -> Theme {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

impl Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Dark => write!(f, "dark"),
            Theme::Light => write!(f, "light"),
        }
    }
}

/// Persistence for user choices that outlive a single command.
pub trait PreferenceStore {
    fn load_goals(&self) -> impl Future<Output = Result<Vec<Goal>>>;
    fn save_goals(&self, goals: &[Goal]) -> impl Future<Output = Result<()>>;

    fn load_active_challenges(&self) -> impl Future<Output = Result<Vec<ActiveChallenge>>>;
    fn save_active_challenges(
        &self,
        challenges: &[ActiveChallenge],
    ) -> impl Future<Output = Result<()>>;

    fn load_theme(&self) -> impl Future<Output = Result<Theme>>;
    fn save_theme(&self, theme: Theme) -> impl Future<Output = Result<()>>;
}

/// Keeps every preference in its own JSON file.
pub struct JsonPreferenceStore {
    dir: PathBuf,
}

impl JsonPreferenceStore {
    pub fn new(dir: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&dir)?;

        Ok(Self { dir })
    }

    /// Returns `None` when the file does not exist. Unparsable content is logged and treated the
    /// same way.
    async fn read<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);
        let content = match read_locked(&path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{path:?} does not exist yet");
                return Ok(None);
            }
            Err(e) => Err(e).with_context(|| format!("Failed to read {path:?}"))?,
        };

        match serde_json::from_str::<T>(&content) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                error!("Preference file {path:?} is corrupted, using defaults {e}");
                Ok(None)
            }
        }
    }

    async fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let content = serde_json::to_vec_pretty(value)?;
        write_locked(&path, &content)
            .await
            .with_context(|| format!("Failed to write {path:?}"))?;
        debug!("Saved {path:?}");
        Ok(())
    }
}

impl PreferenceStore for JsonPreferenceStore {
    async fn load_goals(&self) -> Result<Vec<Goal>> {
        match self.read(GOALS_FILE).await? {
            Some(goals) => Ok(goals),
            None => {
                let goals = default_goals();
                self.save_goals(&goals).await?;
                Ok(goals)
            }
        }
    }

    async fn save_goals(&self, goals: &[Goal]) -> Result<()> {
        self.write(GOALS_FILE, goals).await
    }

    async fn load_active_challenges(&self) -> Result<Vec<ActiveChallenge>> {
        Ok(self.read(CHALLENGES_FILE).await?.unwrap_or_default())
    }

    async fn save_active_challenges(&self, challenges: &[ActiveChallenge]) -> Result<()> {
        self.write(CHALLENGES_FILE, challenges).await
    }

    async fn load_theme(&self) -> Result<Theme> {
        Ok(self.read(THEME_FILE).await?.unwrap_or_default())
    }

    async fn save_theme(&self, theme: Theme) -> Result<()> {
        self.write(THEME_FILE, &theme).await
    }
}

async fn read_locked(path: &Path) -> Result<String, std::io::Error> {
    let mut file = File::open(path).await?;
    file.lock_shared()?;
    let mut content = String::new();
    let result = file.read_to_string(&mut content).await;
    file.unlock_async().await?;
    result.map(|_| content)
}

async fn write_locked(path: &Path, content: &[u8]) -> Result<(), std::io::Error> {
    let mut file = File::options()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await?;

    // Truncate only while holding the lock.
    file.lock_exclusive()?;
    let result = async {
        file.set_len(0).await?;
        file.write_all(content).await?;
        file.flush().await
    }
    .await;
    file.unlock_async().await?;
    result
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use super::*;

    #[tokio::test]
    async fn first_load_writes_default_goals() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonPreferenceStore::new(dir.path().join("preferences"))?;

        assert_eq!(store.load_goals().await?, default_goals());
        assert!(dir.path().join("preferences").join(GOALS_FILE).exists());
        Ok(())
    }

    #[tokio::test]
    async fn preferences_survive_reopening() -> Result<()> {
        let dir = tempdir()?;
        let goals = vec![Goal {
            id: "g-1".into(),
            app_id: "4".into(),
            limit_minutes: 20,
        }];
        let challenges = vec![ActiveChallenge {
            id: "c2".into(),
            start_date: Utc.with_ymd_and_hms(2025, 5, 1, 7, 0, 0).unwrap(),
        }];

        {
            let store = JsonPreferenceStore::new(dir.path().to_owned())?;
            store.save_goals(&goals).await?;
            store.save_active_challenges(&challenges).await?;
            store.save_theme(Theme::Light).await?;
        }

        let store = JsonPreferenceStore::new(dir.path().to_owned())?;
        assert_eq!(store.load_goals().await?, goals);
        assert_eq!(store.load_active_challenges().await?, challenges);
        assert_eq!(store.load_theme().await?, Theme::Light);
        Ok(())
    }

    #[tokio::test]
    async fn shorter_write_replaces_content() -> Result<()> {
        let dir = tempdir()?;
        let store = JsonPreferenceStore::new(dir.path().to_owned())?;
        store.save_goals(&default_goals()).await?;
        store.save_goals(&[]).await?;
        assert!(store.load_goals().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn corrupted_files_fall_back_to_defaults() -> Result<()> {
        let dir = tempdir()?;
        for name in [GOALS_FILE, CHALLENGES_FILE, THEME_FILE] {
            std::fs::write(dir.path().join(name), "{not json")?;
        }

        let store = JsonPreferenceStore::new(dir.path().to_owned())?;
        assert_eq!(store.load_goals().await?, default_goals());
        assert!(store.load_active_challenges().await?.is_empty());
        assert_eq!(store.load_theme().await?, Theme::Dark);
        Ok(())
    }

    #[test]
    fn theme_toggles() {
        assert_eq!(Theme::default().toggle(), Theme::Light);
        assert_eq!(Theme::Light.toggle(), Theme::Dark);
        assert_eq!(serde_json::to_string(&Theme::Light).unwrap(), r#""light""#);
    }
}
