use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::{ClassEvent, EventKey, ScheduleMap};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read schedule file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("schedule file {path} is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode schedule: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write schedule file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Durable mapping of registered classes. The whole map lives behind one
/// lock; every mutation rewrites the backing file before returning, so a
/// successful call means the change is on disk.
#[derive(Debug)]
pub struct ScheduleStore {
    path: PathBuf,
    inner: RwLock<ScheduleMap>,
}

impl ScheduleStore {
    /// Reads the persisted schedule. A missing file yields an empty schedule;
    /// an unreadable or malformed one is an error, since starting with
    /// silently dropped registrations is worse than not starting.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let map = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Malformed {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => ScheduleMap::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        Ok(Self {
            path,
            inner: RwLock::new(map),
        })
    }

    /// Inserts or replaces the event under its derived key and persists.
    /// On a write failure the in-memory map is rolled back so memory and
    /// disk stay consistent.
    pub async fn upsert(&self, group_id: &str, event: ClassEvent) -> Result<EventKey, StoreError> {
        let key = event.key();
        let mut map = self.inner.write().await;
        let previous = map
            .entry(group_id.to_string())
            .or_default()
            .insert(key.clone(), event);
        if let Err(err) = self.persist(&map).await {
            match previous {
                Some(old) => {
                    if let Some(group) = map.get_mut(group_id) {
                        group.insert(key, old);
                    }
                }
                None => {
                    if let Some(group) = map.get_mut(group_id) {
                        group.remove(&key);
                        if group.is_empty() {
                            map.remove(group_id);
                        }
                    }
                }
            }
            return Err(err);
        }
        Ok(key)
    }

    /// Removes every event whose name contains `query` case-insensitively,
    /// persisting once for the whole batch. An empty result means no match,
    /// not an error.
    pub async fn remove_by_name(
        &self,
        group_id: &str,
        query: &str,
    ) -> Result<Vec<ClassEvent>, StoreError> {
        let needle = query.to_lowercase();
        let mut map = self.inner.write().await;
        let Some(group) = map.get_mut(group_id) else {
            return Ok(Vec::new());
        };
        let keys: Vec<EventKey> = group
            .iter()
            .filter(|(_, event)| event.name.to_lowercase().contains(&needle))
            .map(|(key, _)| key.clone())
            .collect();
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut removed = Vec::with_capacity(keys.len());
        for key in &keys {
            if let Some(event) = group.remove(key) {
                removed.push(event);
            }
        }
        if group.is_empty() {
            map.remove(group_id);
        }
        if let Err(err) = self.persist(&map).await {
            let group = map.entry(group_id.to_string()).or_default();
            for event in &removed {
                group.insert(event.key(), event.clone());
            }
            return Err(err);
        }
        Ok(removed)
    }

    /// Events of one group, ordered by weekday, time, then name.
    pub async fn list(&self, group_id: &str) -> Vec<ClassEvent> {
        let map = self.inner.read().await;
        let mut events: Vec<ClassEvent> = map
            .get(group_id)
            .map(|group| group.values().cloned().collect())
            .unwrap_or_default();
        events.sort_by(|a, b| {
            a.day
                .num_days_from_monday()
                .cmp(&b.day.num_days_from_monday())
                .then(a.time.cmp(&b.time))
                .then(a.name.cmp(&b.name))
        });
        events
    }

    /// Cloned snapshot for the scheduler tick, so the scan never holds the
    /// lock across dispatch I/O.
    pub async fn snapshot(&self) -> ScheduleMap {
        self.inner.read().await.clone()
    }

    async fn persist(&self, map: &ScheduleMap) -> Result<(), StoreError> {
        let body = serde_json::to_string_pretty(map).map_err(StoreError::Encode)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, body.as_bytes())
            .await
            .map_err(|source| StoreError::Write {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        debug!(path = %self.path.display(), "schedule persisted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveTime, Weekday};

    use super::*;

    fn event(name: &str, day: Weekday, hour: u32, minute: u32) -> ClassEvent {
        ClassEvent {
            name: name.to_string(),
            day,
            time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
            description: String::new(),
            channel_id: 100,
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScheduleStore::load(dir.path().join("classes.json"))
            .await
            .unwrap();
        assert!(store.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_load_malformed_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = ScheduleStore::load(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_upsert_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classes.json");

        let store = ScheduleStore::load(&path).await.unwrap();
        let key = store
            .upsert("guild-1", event("파이썬", Weekday::Mon, 14, 30))
            .await
            .unwrap();
        assert_eq!(key, "파이썬_mon_14:30");

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("파이썬"));

        let reloaded = ScheduleStore::load(&path).await.unwrap();
        assert_eq!(reloaded.snapshot().await, store.snapshot().await);
    }

    #[tokio::test]
    async fn test_upsert_same_key_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScheduleStore::load(dir.path().join("classes.json"))
            .await
            .unwrap();

        let mut first = event("Python", Weekday::Mon, 14, 30);
        first.description = "room A".to_string();
        let mut second = event("Python", Weekday::Mon, 14, 30);
        second.description = "room B".to_string();

        let key_a = store.upsert("guild-1", first).await.unwrap();
        let key_b = store.upsert("guild-1", second).await.unwrap();
        assert_eq!(key_a, key_b);

        let events = store.list("guild-1").await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].description, "room B");
    }

    #[tokio::test]
    async fn test_remove_by_name_substring_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScheduleStore::load(dir.path().join("classes.json"))
            .await
            .unwrap();
        store
            .upsert("guild-1", event("Python Basics", Weekday::Mon, 9, 0))
            .await
            .unwrap();
        store
            .upsert("guild-1", event("Advanced PYTHON", Weekday::Wed, 18, 0))
            .await
            .unwrap();
        store
            .upsert("guild-1", event("Linear Algebra", Weekday::Fri, 10, 0))
            .await
            .unwrap();

        let removed = store.remove_by_name("guild-1", "pyth").await.unwrap();
        assert_eq!(removed.len(), 2);

        let remaining = store.list("guild-1").await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].name, "Linear Algebra");
    }

    #[tokio::test]
    async fn test_remove_without_match_leaves_schedule_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScheduleStore::load(dir.path().join("classes.json"))
            .await
            .unwrap();
        store
            .upsert("guild-1", event("Python", Weekday::Mon, 9, 0))
            .await
            .unwrap();
        let before = store.snapshot().await;

        let removed = store.remove_by_name("guild-1", "chemistry").await.unwrap();
        assert!(removed.is_empty());
        assert_eq!(store.snapshot().await, before);

        let removed = store.remove_by_name("other-guild", "python").await.unwrap();
        assert!(removed.is_empty());
        assert_eq!(store.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_day_then_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScheduleStore::load(dir.path().join("classes.json"))
            .await
            .unwrap();
        store
            .upsert("guild-1", event("Late", Weekday::Fri, 18, 0))
            .await
            .unwrap();
        store
            .upsert("guild-1", event("Early", Weekday::Mon, 8, 0))
            .await
            .unwrap();
        store
            .upsert("guild-1", event("Noon", Weekday::Mon, 12, 0))
            .await
            .unwrap();

        let names: Vec<String> = store
            .list("guild-1")
            .await
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, ["Early", "Noon", "Late"]);
    }

    #[tokio::test]
    async fn test_failed_write_rolls_back_memory() {
        let dir = tempfile::tempdir().unwrap();
        // Parent directory never exists, so the persist step must fail.
        let path = dir.path().join("missing").join("classes.json");
        let store = ScheduleStore::load(&path).await.unwrap();

        let err = store
            .upsert("guild-1", event("Python", Weekday::Mon, 9, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert!(store.snapshot().await.is_empty());
        assert!(store.list("guild-1").await.is_empty());
    }
}
