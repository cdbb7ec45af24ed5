//! File-based bottle-event storage
//!
//! Events are append-only: the only mutation is an administrative
//! correction of count/weight. Every aggregation reads fresh from here.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use tokio::sync::RwLock;

use super::model::{deposit_now, BottleEvent, NewBottleEvent};
use crate::{Error, Result};

#[derive(Default)]
struct BottleState {
    events: HashMap<i64, BottleEvent>,
    next_id: i64,
}

pub struct BottleStore {
    path: PathBuf,
    state: RwLock<BottleState>,
}

impl BottleStore {
    /// Create a new BottleStore backed by the given JSON file
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut state = BottleState::default();
        if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            if !content.trim().is_empty() {
                let events: Vec<BottleEvent> = serde_json::from_str(&content)?;
                state.next_id = events.iter().map(|e| e.id).max().unwrap_or(0);
                state.events = events.into_iter().map(|e| (e.id, e)).collect();
            }
        }

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    async fn persist(&self, state: &BottleState) -> Result<()> {
        let mut events: Vec<&BottleEvent> = state.events.values().collect();
        events.sort_by_key(|e| e.id);
        let content = serde_json::to_string_pretty(&events)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }

    /// Record a deposit; concurrent records are independent inserts
    pub async fn create(&self, new_event: NewBottleEvent) -> Result<BottleEvent> {
        validate_totals(new_event.bottle_count, new_event.bottle_weight)?;

        let mut state = self.state.write().await;
        state.next_id += 1;
        let created_at = new_event.created_at.unwrap_or_else(deposit_now);
        let event = BottleEvent {
            id: state.next_id,
            machine_id: new_event.machine_id,
            bottle_count: new_event.bottle_count,
            bottle_weight: new_event.bottle_weight,
            created_by: new_event.recorded_by,
            created_at,
            updated_by: new_event.recorded_by,
            updated_at: created_at,
        };
        state.events.insert(event.id, event.clone());
        self.persist(&state).await?;
        tracing::debug!(
            id = event.id,
            machine_id = event.machine_id,
            bottle_count = event.bottle_count,
            "Bottle deposit recorded"
        );
        Ok(event)
    }

    pub async fn get(&self, id: i64) -> Option<BottleEvent> {
        let state = self.state.read().await;
        state.events.get(&id).cloned()
    }

    /// List all events in id order
    pub async fn list(&self) -> Vec<BottleEvent> {
        let state = self.state.read().await;
        let mut events: Vec<BottleEvent> = state.events.values().cloned().collect();
        events.sort_by_key(|e| e.id);
        events
    }

    /// List events for the given machines, optionally bounded by creation time
    pub async fn list_for_machines(
        &self,
        machine_ids: &[i64],
        since: Option<DateTime<FixedOffset>>,
        until: Option<DateTime<FixedOffset>>,
    ) -> Vec<BottleEvent> {
        let state = self.state.read().await;
        let mut events: Vec<BottleEvent> = state
            .events
            .values()
            .filter(|e| machine_ids.contains(&e.machine_id))
            .filter(|e| since.map_or(true, |since| e.created_at >= since))
            .filter(|e| until.map_or(true, |until| e.created_at < until))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.id);
        events
    }

    /// Administrative correction of a recorded deposit's totals
    pub async fn update_totals(
        &self,
        id: i64,
        bottle_count: i64,
        bottle_weight: f64,
        actor_id: i64,
    ) -> Result<BottleEvent> {
        validate_totals(bottle_count, bottle_weight)?;

        let mut state = self.state.write().await;
        let event = state
            .events
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Bottle event {}", id)))?;
        event.bottle_count = bottle_count;
        event.bottle_weight = bottle_weight;
        event.updated_by = actor_id;
        event.updated_at = deposit_now();
        let event = event.clone();
        self.persist(&state).await?;
        Ok(event)
    }

    pub async fn count(&self) -> usize {
        let state = self.state.read().await;
        state.events.len()
    }
}

fn validate_totals(bottle_count: i64, bottle_weight: f64) -> Result<()> {
    if bottle_count < 0 {
        return Err(Error::InvalidInput(
            "Bottle count cannot be negative".to_string(),
        ));
    }
    if !bottle_weight.is_finite() || bottle_weight < 0.0 {
        return Err(Error::InvalidInput(format!(
            "Invalid bottle weight {}",
            bottle_weight
        )));
    }
    Ok(())
}
