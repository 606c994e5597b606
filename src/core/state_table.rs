//! Per-slot latest state shared between the sensor loop and request handlers.
//!
//! The map itself is built once and never resized. Each entry holds an
//! `Arc<SlotState>` behind its own lock; publishing swaps the `Arc`, so a
//! reader either sees the old state or the new one, never a mix.

use crate::errors::{AppError, AppResult};
use crate::models::SlotState;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

pub struct SlotStateTable {
    entries: BTreeMap<u32, RwLock<Arc<SlotState>>>,
}

/// Answers "is this slot known, and does its sensor see a vehicle?".
pub trait SlotOccupancy: Send + Sync {
    /// `None` for unknown slots.
    fn occupancy(&self, slot_id: u32) -> Option<bool>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSummary {
    pub total_slots: usize,
    pub occupied: usize,
    pub free: usize,
    pub slots: BTreeMap<u32, SlotState>,
    /// Time of the most recent publish, so repeated reads between sweeps match.
    pub last_updated: DateTime<Utc>,
}

impl SlotStateTable {
    /// Pre-populate every slot as free with no reading.
    pub fn new<I: IntoIterator<Item = u32>>(slot_ids: I, now: DateTime<Utc>) -> Self {
        let initial = Arc::new(SlotState::initial(now));
        let entries = slot_ids
            .into_iter()
            .map(|id| (id, RwLock::new(Arc::clone(&initial))))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, slot_id: u32) -> bool {
        self.entries.contains_key(&slot_id)
    }

    pub fn get(&self, slot_id: u32) -> Option<Arc<SlotState>> {
        self.entries
            .get(&slot_id)
            .map(|entry| Arc::clone(&entry.read()))
    }

    /// Replace one slot's state. Only the sensor loop calls this.
    pub fn publish(&self, slot_id: u32, state: SlotState) -> AppResult<()> {
        let entry = self
            .entries
            .get(&slot_id)
            .ok_or(AppError::SlotNotFound(slot_id))?;
        *entry.write() = Arc::new(state);
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<(u32, Arc<SlotState>)> {
        self.entries
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(&entry.read())))
            .collect()
    }

    pub fn summary(&self) -> StatusSummary {
        let snapshot = self.snapshot();
        let occupied = snapshot.iter().filter(|(_, s)| s.occupied).count();
        let last_updated = snapshot
            .iter()
            .map(|(_, s)| s.last_updated)
            .max()
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        StatusSummary {
            total_slots: snapshot.len(),
            occupied,
            free: snapshot.len() - occupied,
            slots: snapshot
                .into_iter()
                .map(|(id, s)| (id, (*s).clone()))
                .collect(),
            last_updated,
        }
    }
}

impl SlotOccupancy for SlotStateTable {
    fn occupancy(&self, slot_id: u32) -> Option<bool> {
        self.get(slot_id).map(|s| s.occupied)
    }
}
