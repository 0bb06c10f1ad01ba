use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{PhoneStore, StoreError};
use crate::model::{PhoneChanges, PhoneFilter, PhoneRecord, RecordId};
use crate::schema::{PhoneNumber, COLLECTION};

/// In-process store. Records are kept in insertion order.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<Vec<PhoneRecord>>,
    calls: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations served so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub async fn get(&self, id: RecordId) -> Option<PhoneRecord> {
        self.records
            .lock()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

#[async_trait]
impl PhoneStore for MemoryStore {
    async fn find(
        &self,
        filter: &PhoneFilter,
        limit: Option<i64>,
    ) -> Result<Vec<PhoneRecord>, StoreError> {
        self.touch();
        let limit = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(0));
        Ok(self
            .records
            .lock()
            .await
            .iter()
            .filter(|r| filter.matches(r))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn insert(
        &self,
        record: &PhoneNumber,
        now: DateTime<Utc>,
    ) -> Result<RecordId, StoreError> {
        self.touch();
        let id = RecordId::new_random();
        self.records.lock().await.push(PhoneRecord {
            id,
            phone: record.phone().to_string(),
            country: record.country().map(str::to_string),
            status: record.status(),
            note: record.note().map(str::to_string),
            created_at: Some(now),
            updated_at: Some(now),
        });
        Ok(id)
    }

    async fn update(
        &self,
        id: RecordId,
        changes: &PhoneChanges,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        self.touch();
        let mut records = self.records.lock().await;
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                changes.apply(record);
                record.updated_at = Some(now);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete(&self, id: RecordId) -> Result<u64, StoreError> {
        self.touch();
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|r| r.id != id);
        Ok((before - records.len()) as u64)
    }

    async fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        self.touch();
        Ok(vec![COLLECTION.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PhoneStatus;

    fn number(phone: &str, status: PhoneStatus) -> PhoneNumber {
        PhoneNumber::new(phone.to_string(), None, status, None).unwrap()
    }

    #[tokio::test]
    async fn find_keeps_insertion_order_and_limit() {
        let store = MemoryStore::new();
        let now = Utc::now();
        for p in ["1", "2", "3"] {
            store.insert(&number(p, PhoneStatus::Unknown), now).await.unwrap();
        }
        let all = store.find(&PhoneFilter::default(), None).await.unwrap();
        let phones: Vec<_> = all.iter().map(|r| r.phone.as_str()).collect();
        assert_eq!(phones, ["1", "2", "3"]);

        let two = store.find(&PhoneFilter::default(), Some(2)).await.unwrap();
        assert_eq!(two.len(), 2);
    }

    #[tokio::test]
    async fn update_and_delete_report_counts() {
        let store = MemoryStore::new();
        let t0 = Utc::now();
        let id = store.insert(&number("555", PhoneStatus::Unknown), t0).await.unwrap();

        let t1 = t0 + chrono::Duration::seconds(5);
        let changes = PhoneChanges {
            note: Some("called".into()),
            ..Default::default()
        };
        assert_eq!(store.update(id, &changes, t1).await.unwrap(), 1);
        let rec = store.get(id).await.unwrap();
        assert_eq!(rec.note.as_deref(), Some("called"));
        assert_eq!(rec.created_at, Some(t0));
        assert_eq!(rec.updated_at, Some(t1));

        assert_eq!(store.delete(id).await.unwrap(), 1);
        assert_eq!(store.delete(id).await.unwrap(), 0);
        assert_eq!(
            store.update(id, &changes, t1).await.unwrap(),
            0,
            "missing record is not modified"
        );
    }
}
