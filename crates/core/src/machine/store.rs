//! File-based machine storage

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use tokio::sync::RwLock;

use super::model::{Machine, MachineSpec};
use crate::{Error, Result};

#[derive(Default)]
struct MachineState {
    machines: HashMap<i64, Machine>,
    next_id: i64,
}

pub struct MachineStore {
    path: PathBuf,
    state: RwLock<MachineState>,
}

impl MachineStore {
    /// Create a new MachineStore backed by the given JSON file
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut state = MachineState::default();
        if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            if !content.trim().is_empty() {
                let machines: Vec<Machine> = serde_json::from_str(&content)?;
                state.next_id = machines.iter().map(|m| m.id).max().unwrap_or(0);
                state.machines = machines.into_iter().map(|m| (m.id, m)).collect();
            }
        }

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    async fn persist(&self, state: &MachineState) -> Result<()> {
        let mut machines: Vec<&Machine> = state.machines.values().collect();
        machines.sort_by_key(|m| m.id);
        let content = serde_json::to_string_pretty(&machines)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }

    /// Register a machine; the serial number must be unused
    pub async fn create(&self, spec: MachineSpec, actor_id: i64) -> Result<Machine> {
        validate_spec(&spec)?;

        let mut state = self.state.write().await;
        if state.machines.values().any(|m| m.number == spec.number) {
            return Err(Error::Conflict(format!(
                "Machine number '{}' already exists",
                spec.number
            )));
        }

        state.next_id += 1;
        let now = Utc::now();
        let machine = Machine {
            id: state.next_id,
            name: spec.name,
            number: spec.number,
            street: spec.street,
            city: spec.city,
            state: spec.state,
            pin_code: spec.pin_code,
            business_id: spec.business_id,
            created_by: actor_id,
            created_at: now,
            updated_by: actor_id,
            updated_at: now,
        };
        state.machines.insert(machine.id, machine.clone());
        self.persist(&state).await?;
        tracing::debug!(id = machine.id, number = %machine.number, "Machine registered");
        Ok(machine)
    }

    pub async fn get(&self, id: i64) -> Option<Machine> {
        let state = self.state.read().await;
        state.machines.get(&id).cloned()
    }

    /// List all machines in id order
    pub async fn list(&self) -> Vec<Machine> {
        let state = self.state.read().await;
        let mut machines: Vec<Machine> = state.machines.values().cloned().collect();
        machines.sort_by_key(|m| m.id);
        machines
    }

    /// List the machines of one business in id order
    pub async fn list_by_business(&self, business_id: i64) -> Vec<Machine> {
        let state = self.state.read().await;
        let mut machines: Vec<Machine> = state
            .machines
            .values()
            .filter(|m| m.business_id == business_id)
            .cloned()
            .collect();
        machines.sort_by_key(|m| m.id);
        machines
    }

    /// Replace the mutable fields of a machine
    pub async fn update(&self, id: i64, spec: MachineSpec, actor_id: i64) -> Result<Machine> {
        validate_spec(&spec)?;

        let mut state = self.state.write().await;
        if state
            .machines
            .values()
            .any(|m| m.id != id && m.number == spec.number)
        {
            return Err(Error::Conflict(format!(
                "Machine number '{}' already exists",
                spec.number
            )));
        }
        let machine = state
            .machines
            .get_mut(&id)
            .ok_or_else(|| Error::MachineNotFound(id.to_string()))?;
        machine.name = spec.name;
        machine.number = spec.number;
        machine.street = spec.street;
        machine.city = spec.city;
        machine.state = spec.state;
        machine.pin_code = spec.pin_code;
        machine.business_id = spec.business_id;
        machine.updated_by = actor_id;
        machine.updated_at = Utc::now();
        let machine = machine.clone();
        self.persist(&state).await?;
        Ok(machine)
    }

    pub async fn delete(&self, id: i64) -> Result<Machine> {
        let mut state = self.state.write().await;
        let machine = state
            .machines
            .remove(&id)
            .ok_or_else(|| Error::MachineNotFound(id.to_string()))?;
        self.persist(&state).await?;
        Ok(machine)
    }

    pub async fn count(&self) -> usize {
        let state = self.state.read().await;
        state.machines.len()
    }
}

fn validate_spec(spec: &MachineSpec) -> Result<()> {
    let fields = [
        ("name", &spec.name),
        ("number", &spec.number),
        ("street", &spec.street),
        ("city", &spec.city),
        ("state", &spec.state),
        ("pinCode", &spec.pin_code),
    ];
    for (field, value) in fields {
        if value.trim().is_empty() {
            return Err(Error::InvalidInput(format!(
                "Machine {} cannot be empty",
                field
            )));
        }
    }
    Ok(())
}
