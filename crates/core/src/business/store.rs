//! File-based business storage
//!
//! Businesses are kept in memory behind a lock and mirrored to a JSON file
//! on every write. Name and mobile are unique across all businesses.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Utc;
use tokio::sync::RwLock;

use super::model::Business;
use crate::{Error, Result};

#[derive(Default)]
struct BusinessState {
    businesses: HashMap<i64, Business>,
    next_id: i64,
}

pub struct BusinessStore {
    path: PathBuf,
    state: RwLock<BusinessState>,
}

impl BusinessStore {
    /// Create a new BusinessStore backed by the given JSON file
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut state = BusinessState::default();
        if path.exists() {
            let content = tokio::fs::read_to_string(&path).await?;
            if !content.trim().is_empty() {
                let businesses: Vec<Business> = serde_json::from_str(&content)?;
                state.next_id = businesses.iter().map(|b| b.id).max().unwrap_or(0);
                state.businesses = businesses.into_iter().map(|b| (b.id, b)).collect();
            }
        }

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    async fn persist(&self, state: &BusinessState) -> Result<()> {
        let mut businesses: Vec<&Business> = state.businesses.values().collect();
        businesses.sort_by_key(|b| b.id);
        let content = serde_json::to_string_pretty(&businesses)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }

    /// Create a business owned by `owner_user_id`
    pub async fn create(
        &self,
        name: &str,
        mobile: &str,
        logo_image: Option<Vec<u8>>,
        owner_user_id: i64,
        actor_id: i64,
    ) -> Result<Business> {
        let name = validate_name(name)?;
        let mobile = validate_mobile(mobile)?;

        let mut state = self.state.write().await;
        if state.businesses.values().any(|b| b.name == name) {
            return Err(Error::Conflict(format!(
                "Business '{}' already exists",
                name
            )));
        }
        if state.businesses.values().any(|b| b.mobile == mobile) {
            return Err(Error::Conflict(format!(
                "Mobile '{}' is already registered",
                mobile
            )));
        }

        state.next_id += 1;
        let now = Utc::now();
        let business = Business {
            id: state.next_id,
            name,
            mobile,
            logo_image,
            owner_user_id,
            created_by: actor_id,
            created_at: now,
            updated_by: actor_id,
            updated_at: now,
        };
        state.businesses.insert(business.id, business.clone());
        self.persist(&state).await?;
        tracing::debug!(id = business.id, name = %business.name, "Business created");
        Ok(business)
    }

    pub async fn get(&self, id: i64) -> Option<Business> {
        let state = self.state.read().await;
        state.businesses.get(&id).cloned()
    }

    /// List all businesses in id order
    pub async fn list(&self) -> Vec<Business> {
        let state = self.state.read().await;
        let mut businesses: Vec<Business> = state.businesses.values().cloned().collect();
        businesses.sort_by_key(|b| b.id);
        businesses
    }

    pub async fn find_by_owner(&self, owner_user_id: i64) -> Option<Business> {
        let state = self.state.read().await;
        state
            .businesses
            .values()
            .find(|b| b.owner_user_id == owner_user_id)
            .cloned()
    }

    /// Update name, mobile and/or logo; unset fields keep their value
    pub async fn update(
        &self,
        id: i64,
        name: Option<&str>,
        mobile: Option<&str>,
        logo_image: Option<Vec<u8>>,
        actor_id: i64,
    ) -> Result<Business> {
        let name = name.map(validate_name).transpose()?;
        let mobile = mobile.map(validate_mobile).transpose()?;

        let mut state = self.state.write().await;
        if !state.businesses.contains_key(&id) {
            return Err(Error::BusinessNotFound(id.to_string()));
        }
        if let Some(name) = &name {
            if state
                .businesses
                .values()
                .any(|b| b.id != id && b.name == *name)
            {
                return Err(Error::Conflict(format!(
                    "Business '{}' already exists",
                    name
                )));
            }
        }
        if let Some(mobile) = &mobile {
            if state
                .businesses
                .values()
                .any(|b| b.id != id && b.mobile == *mobile)
            {
                return Err(Error::Conflict(format!(
                    "Mobile '{}' is already registered",
                    mobile
                )));
            }
        }

        let business = state
            .businesses
            .get_mut(&id)
            .ok_or_else(|| Error::BusinessNotFound(id.to_string()))?;
        if let Some(name) = name {
            business.name = name;
        }
        if let Some(mobile) = mobile {
            business.mobile = mobile;
        }
        if let Some(logo_image) = logo_image {
            business.logo_image = Some(logo_image);
        }
        business.updated_by = actor_id;
        business.updated_at = Utc::now();
        let business = business.clone();
        self.persist(&state).await?;
        Ok(business)
    }

    pub async fn delete(&self, id: i64) -> Result<Business> {
        let mut state = self.state.write().await;
        let business = state
            .businesses
            .remove(&id)
            .ok_or_else(|| Error::BusinessNotFound(id.to_string()))?;
        self.persist(&state).await?;
        Ok(business)
    }

    pub async fn count(&self) -> usize {
        let state = self.state.read().await;
        state.businesses.len()
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "Business name cannot be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}

fn validate_mobile(mobile: &str) -> Result<String> {
    let mobile = mobile.trim();
    if mobile.is_empty() || !mobile.chars().all(|c| c.is_ascii_digit() || c == '+') {
        return Err(Error::InvalidInput(format!(
            "Invalid mobile number '{}'",
            mobile
        )));
    }
    Ok(mobile.to_string())
}
