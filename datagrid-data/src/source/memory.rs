//! In-memory data source

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::DataSource;
use super::SourceOp;
use crate::error::SourceError;
use crate::model::{FieldAccess, FieldValues, Identity, Record, RowId, Value};

/// How [`MemorySource`] assigns ids to created records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdStrategy {
    /// Next integer after the largest numeric id seen.
    #[default]
    Sequential,
    /// Random v4 UUIDs.
    Uuid,
}

/// A [`DataSource`] over records held in memory.
///
/// Useful for tests and demos. Supports artificial latency, one-shot failure
/// injection per operation and call counting.
///
/// # Example
///
/// ```
/// use datagrid_data::model::Record;
/// use datagrid_data::source::MemorySource;
///
/// let source = MemorySource::new("id").with_records(vec![
///     Record::new().set("id", "1").set("name", "Alice"),
/// ]);
/// assert_eq!(source.id_field(), "id");
/// ```
#[derive(Debug)]
pub struct MemorySource {
    id_field: String,
    records: RwLock<Vec<Record>>,
    next_id: AtomicU64,
    strategy: IdStrategy,
    latency: Option<Duration>,
    failures: DashMap<SourceOp, SourceError>,
    calls: DashMap<SourceOp, usize>,
}

impl MemorySource {
    /// Creates an empty source whose records are identified by `id_field`.
    pub fn new(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            records: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            strategy: IdStrategy::default(),
            latency: None,
            failures: DashMap::new(),
            calls: DashMap::new(),
        }
    }

    /// Seeds the source with records.
    pub fn with_records(mut self, records: Vec<Record>) -> Self {
        let max_id = records
            .iter()
            .filter_map(|r| RowId::from_value(&r.field(&self.id_field)))
            .filter_map(|id| id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        self.next_id = AtomicU64::new(max_id + 1);
        self.records = RwLock::new(records);
        self
    }

    /// Sets the id assignment strategy.
    pub fn with_id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Delays every operation by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns the id field name.
    pub fn id_field(&self) -> &str {
        &self.id_field
    }

    /// Makes the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: SourceOp, error: SourceError) {
        self.failures.insert(op, error);
    }

    /// Returns how many times `op` was called.
    pub fn calls(&self, op: SourceOp) -> usize {
        self.calls.get(&op).map(|c| *c).unwrap_or(0)
    }

    /// Returns a snapshot of the stored records.
    pub async fn snapshot(&self) -> Vec<Record> {
        self.records.read().await.clone()
    }

    async fn enter(&self, op: SourceOp) -> Result<(), SourceError> {
        *self.calls.entry(op).or_insert(0) += 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.failures.remove(&op) {
            Some((_, error)) => {
                log::debug!("MemorySource injected failure for {}", op);
                Err(error)
            }
            None => Ok(()),
        }
    }

    fn assign_id(&self) -> RowId {
        match self.strategy {
            IdStrategy::Sequential => {
                let next = self.next_id.fetch_add(1, Ordering::SeqCst);
                RowId::from(next.to_string())
            }
            IdStrategy::Uuid => RowId::from(Uuid::new_v4()),
        }
    }

    fn id_of(&self, record: &Record) -> Option<RowId> {
        RowId::from_value(&record.field(&self.id_field))
    }
}

#[async_trait]
impl DataSource<Record> for MemorySource {
    async fn list(&self) -> Result<Vec<Record>, SourceError> {
        self.enter(SourceOp::List).await?;
        Ok(self.records.read().await.clone())
    }

    async fn create(&self, mut values: FieldValues) -> Result<Record, SourceError> {
        self.enter(SourceOp::Create).await?;
        let id = self.assign_id();
        values.insert(self.id_field.clone(), Value::from(id.clone()));
        let record = Record::from_fields(values);
        self.records.write().await.push(record.clone());
        log::debug!("MemorySource created record {}", id);
        Ok(record)
    }

    async fn update(&self, id: &RowId, values: FieldValues) -> Result<Record, SourceError> {
        self.enter(SourceOp::Update).await?;
        let mut records = self.records.write().await;
        let record = records
            .iter_mut()
            .find(|r| self.id_of(r).as_ref() == Some(id))
            .ok_or_else(|| SourceError::http(404, format!("Record {} not found", id)))?;
        record.merge(values);
        record.insert(self.id_field.clone(), Value::from(id.clone()));
        Ok(record.clone())
    }

    async fn remove(&self, id: &RowId) -> Result<(), SourceError> {
        self.enter(SourceOp::Remove).await?;
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| self.id_of(r).as_ref() != Some(id));
        if records.len() == before {
            return Err(SourceError::http(404, format!("Record {} not found", id)));
        }
        Ok(())
    }

    fn identity(&self) -> Identity<Record> {
        Identity::field(self.id_field.clone())
    }
}
