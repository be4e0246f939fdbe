use crate::app::ports::RecordStorePort;
use crate::error::{CrawlerError, Result};
use crate::types::EventRecord;
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// In-memory record store for development, dry runs and tests.
#[derive(Default)]
pub struct InMemoryRecordStore {
    events: Mutex<Vec<(Uuid, EventRecord)>>,
    insert_calls: Mutex<usize>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with `(title, venue)` rows.
    pub fn with_existing(rows: &[(&str, &str)]) -> Self {
        let seeded = rows
            .iter()
            .map(|(title, venue)| {
                let record = EventRecord {
                    title: title.to_string(),
                    venue: venue.to_string(),
                    ..Default::default()
                };
                (Uuid::new_v4(), record)
            })
            .collect();
        Self {
            events: Mutex::new(seeded),
            insert_calls: Mutex::new(0),
        }
    }

    pub fn records(&self) -> Vec<EventRecord> {
        self.events
            .lock()
            .map(|events| events.iter().map(|(_, r)| r.clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `insert` calls received, successful or not.
    pub fn insert_calls(&self) -> usize {
        self.insert_calls.lock().map(|n| *n).unwrap_or(0)
    }

    fn events(&self) -> Result<MutexGuard<'_, Vec<(Uuid, EventRecord)>>> {
        self.events
            .lock()
            .map_err(|_| CrawlerError::Store("in-memory store lock poisoned".into()))
    }
}

#[async_trait]
impl RecordStorePort for InMemoryRecordStore {
    async fn exists(&self, title: &str, venue: &str) -> Result<bool> {
        let title = title.trim().to_lowercase();
        let venue = venue.trim().to_lowercase();
        let events = self.events()?;
        Ok(events.iter().any(|(_, e)| {
            e.title.trim().to_lowercase() == title && e.venue.trim().to_lowercase() == venue
        }))
    }

    async fn insert(&self, record: &EventRecord) -> Result<()> {
        if let Ok(mut calls) = self.insert_calls.lock() {
            *calls += 1;
        }
        let id = Uuid::new_v4();
        self.events()?.push((id, record.clone()));

        debug!("Created event: {} with id {}", record.title, id);
        Ok(())
    }
}
