//! Gate entry service
//!
//! Records vehicle movements at the warehouse gate and links them to the
//! intake or release they belong to.

use coldstore_core::{
    models::{GateEntry, GateEntryState, GateEntryType},
    traits::{Clock, GateEntryRepository, Sequencer},
    AppError, AppResult,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

/// Input for recording a gate movement
#[derive(Debug, Clone)]
pub struct NewGateEntry {
    pub entry_type: GateEntryType,
    pub vehicle_number: String,
    pub driver_name: String,
    pub driver_contact: Option<String>,
    pub entry_time: Option<DateTime<Utc>>,
    pub intake_id: Option<i64>,
    pub release_id: Option<i64>,
    pub guard_id: i64,
    pub notes: Option<String>,
    pub company_id: i64,
}

/// Gate entry business logic
pub struct GateEntryService {
    gate_repo: Arc<dyn GateEntryRepository>,
    sequencer: Arc<dyn Sequencer>,
    clock: Arc<dyn Clock>,
}

impl GateEntryService {
    pub fn new(
        gate_repo: Arc<dyn GateEntryRepository>,
        sequencer: Arc<dyn Sequencer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            gate_repo,
            sequencer,
            clock,
        }
    }

    /// Record a gate movement in the draft state. Gate-in and gate-out
    /// entries draw from separate number series.
    #[instrument(skip(self, input), fields(entry_type = %input.entry_type))]
    pub async fn create(&self, input: NewGateEntry) -> AppResult<GateEntry> {
        let now = self.clock.now();
        let number = self
            .sequencer
            .next_document_number(input.entry_type.sequence_series())
            .await?;

        let entry = GateEntry {
            id: 0,
            number,
            entry_type: input.entry_type,
            vehicle_number: input.vehicle_number,
            driver_name: input.driver_name,
            driver_contact: input.driver_contact,
            entry_time: input.entry_time.unwrap_or(now),
            intake_id: input.intake_id,
            release_id: input.release_id,
            guard_id: input.guard_id,
            state: GateEntryState::Draft,
            notes: input.notes,
            company_id: input.company_id,
            created_at: now,
        };
        entry.validate()?;

        let entry = self.gate_repo.create(&entry).await?;
        info!(
            "Recorded {} {} for vehicle {}",
            entry.entry_type, entry.number, entry.vehicle_number
        );
        Ok(entry)
    }

    /// Confirm a draft entry once the guard has verified the vehicle.
    #[instrument(skip(self))]
    pub async fn confirm(&self, entry_id: i64) -> AppResult<GateEntry> {
        let mut entry = self.get(entry_id).await?;
        entry.confirm()?;
        self.gate_repo.update(&entry).await
    }

    /// Cancel an entry.
    #[instrument(skip(self))]
    pub async fn cancel(&self, entry_id: i64) -> AppResult<GateEntry> {
        let mut entry = self.get(entry_id).await?;
        entry.cancel()?;
        self.gate_repo.update(&entry).await
    }

    /// Fetch an entry by id.
    pub async fn get(&self, entry_id: i64) -> AppResult<GateEntry> {
        self.gate_repo
            .find_by_id(entry_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("gate entry {entry_id}")))
    }

    /// Entries linked to an intake or release document.
    pub async fn list_for_document(
        &self,
        intake_id: Option<i64>,
        release_id: Option<i64>,
    ) -> AppResult<Vec<GateEntry>> {
        self.gate_repo.find_by_document(intake_id, release_id).await
    }

    /// List entries with pagination.
    pub async fn list(&self, limit: i64, offset: i64) -> AppResult<Vec<GateEntry>> {
        self.gate_repo.find_all(limit, offset).await
    }

    /// Total number of entries.
    pub async fn count(&self) -> AppResult<i64> {
        self.gate_repo.count().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockClock, MockSequencer};
    use async_trait::async_trait;
    use coldstore_core::traits::Repository;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct MockGateEntryRepository {
        entries: Mutex<HashMap<i64, GateEntry>>,
    }

    #[async_trait]
    impl Repository<GateEntry, i64> for MockGateEntryRepository {
        async fn find_by_id(&self, id: i64) -> Result<Option<GateEntry>, AppError> {
            Ok(self.entries.lock().get(&id).cloned())
        }

        async fn find_all(&self, limit: i64, offset: i64) -> Result<Vec<GateEntry>, AppError> {
            let mut all: Vec<_> = self.entries.lock().values().cloned().collect();
            all.sort_by_key(|e| e.id);
            Ok(all
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn count(&self) -> Result<i64, AppError> {
            Ok(self.entries.lock().len() as i64)
        }

        async fn create(&self, entity: &GateEntry) -> Result<GateEntry, AppError> {
            let mut entries = self.entries.lock();
            let mut entry = entity.clone();
            entry.id = entries.keys().max().copied().unwrap_or(0) + 1;
            entries.insert(entry.id, entry.clone());
            Ok(entry)
        }

        async fn update(&self, entity: &GateEntry) -> Result<GateEntry, AppError> {
            self.entries.lock().insert(entity.id, entity.clone());
            Ok(entity.clone())
        }

        async fn delete(&self, id: i64) -> Result<bool, AppError> {
            Ok(self.entries.lock().remove(&id).is_some())
        }
    }

    #[async_trait]
    impl GateEntryRepository for MockGateEntryRepository {
        async fn find_by_document(
            &self,
            intake_id: Option<i64>,
            release_id: Option<i64>,
        ) -> Result<Vec<GateEntry>, AppError> {
            Ok(self
                .entries
                .lock()
                .values()
                .filter(|e| {
                    (intake_id.is_some() && e.intake_id == intake_id)
                        || (release_id.is_some() && e.release_id == release_id)
                })
                .cloned()
                .collect())
        }
    }

    fn service() -> GateEntryService {
        GateEntryService::new(
            Arc::new(MockGateEntryRepository::default()),
            Arc::new(MockSequencer::new("GIN")),
            Arc::new(MockClock::default()),
        )
    }

    fn new_entry(entry_type: GateEntryType) -> NewGateEntry {
        NewGateEntry {
            entry_type,
            vehicle_number: "KA-01-AB-1234".into(),
            driver_name: "R. Kumar".into(),
            driver_contact: None,
            entry_time: None,
            intake_id: Some(1),
            release_id: None,
            guard_id: 4,
            notes: None,
            company_id: 1,
        }
    }

    #[tokio::test]
    async fn test_create_and_confirm() {
        let svc = service();
        let entry = svc.create(new_entry(GateEntryType::GateIn)).await.unwrap();
        assert_eq!(entry.state, GateEntryState::Draft);

        let entry = svc.confirm(entry.id).await.unwrap();
        assert_eq!(entry.state, GateEntryState::Confirmed);
        // Confirming twice is a state error.
        assert!(svc.confirm(entry.id).await.is_err());
    }

    #[tokio::test]
    async fn test_blank_vehicle_rejected() {
        let svc = service();
        let mut input = new_entry(GateEntryType::GateIn);
        input.vehicle_number = "   ".into();
        let err = svc.create(input).await.unwrap_err();
        assert!(matches!(err, AppError::MissingField(_)));
    }

    #[tokio::test]
    async fn test_entries_found_by_document() {
        let svc = service();
        svc.create(new_entry(GateEntryType::GateIn)).await.unwrap();
        let mut out = new_entry(GateEntryType::GateOut);
        out.intake_id = None;
        out.release_id = Some(9);
        svc.create(out).await.unwrap();

        let for_intake = svc.list_for_document(Some(1), None).await.unwrap();
        assert_eq!(for_intake.len(), 1);
        assert_eq!(for_intake[0].entry_type, GateEntryType::GateIn);

        let for_release = svc.list_for_document(None, Some(9)).await.unwrap();
        assert_eq!(for_release.len(), 1);
    }
}
