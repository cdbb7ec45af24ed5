//! Credential store
//!
//! File-backed user records: unique normalized email, salted password
//! hash, closed role set and audit fields. The bootstrap super-admin is
//! created before any other user and references itself as creator.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::sync::RwLock;

/// Closed role set; compared verbatim, no hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Customer => "customer",
        }
    }
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "customer" => Ok(Self::Customer),
            _ => Err(AuthError::Validation(format!(
                "Unsupported role '{}'",
                value
            ))),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation: {0}")]
    Validation(String),
    #[error("storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct User {
    id: i64,
    email: String,
    password_hash: String,
    role: Role,
    is_active: bool,
    is_deleted: bool,
    created_by: i64,
    created_at: DateTime<Utc>,
    updated_by: i64,
    updated_at: DateTime<Utc>,
}

/// User record without the password hash
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Default)]
struct UserState {
    users: HashMap<i64, User>,
    next_id: i64,
}

pub struct UserStore {
    path: PathBuf,
    state: RwLock<UserState>,
}

impl UserStore {
    /// Create a new UserStore backed by the given JSON file
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self, AuthError> {
        let path = path.into();
        let mut state = UserState::default();
        if path.exists() {
            let content = tokio::fs::read_to_string(&path)
                .await
                .map_err(|err| AuthError::Storage(format!("Failed to read user store: {}", err)))?;
            if !content.trim().is_empty() {
                let users: Vec<User> = serde_json::from_str(&content).map_err(|err| {
                    AuthError::Storage(format!("Failed to parse user store: {}", err))
                })?;
                state.next_id = users.iter().map(|u| u.id).max().unwrap_or(0);
                state.users = users.into_iter().map(|u| (u.id, u)).collect();
            }
        }

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    async fn persist(&self, state: &UserState) -> Result<(), AuthError> {
        let mut users: Vec<&User> = state.users.values().collect();
        users.sort_by_key(|u| u.id);
        let content = serde_json::to_string_pretty(&users)
            .map_err(|err| AuthError::Storage(format!("Failed to serialize users: {}", err)))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|err| {
                AuthError::Storage(format!("Failed to create user store dir: {}", err))
            })?;
        }
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|err| AuthError::Storage(format!("Failed to write user store: {}", err)))?;
        Ok(())
    }

    /// Create the bootstrap super-admin if it does not exist yet.
    ///
    /// The bootstrap account references itself as creator since no other
    /// user exists at that point.
    pub async fn ensure_superadmin(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserSummary, AuthError> {
        let normalized_email = normalize_email(email)?;
        validate_password(password)?;

        let mut state = self.state.write().await;
        if let Some(existing) = state
            .users
            .values()
            .find(|u| u.email == normalized_email && !u.is_deleted)
        {
            return Ok(user_to_summary(existing));
        }

        state.next_id += 1;
        let id = state.next_id;
        let now = Utc::now();
        let user = User {
            id,
            email: normalized_email,
            password_hash: hash_password(password),
            role: Role::Admin,
            is_active: true,
            is_deleted: false,
            created_by: id,
            created_at: now,
            updated_by: id,
            updated_at: now,
        };
        let summary = user_to_summary(&user);
        state.users.insert(id, user);
        self.persist(&state).await?;
        tracing::info!(email = %summary.email, "Bootstrap super-admin created");
        Ok(summary)
    }

    /// Register a user; `created_by` of None means self-registration
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        role: Role,
        created_by: Option<i64>,
    ) -> Result<UserSummary, AuthError> {
        let normalized_email = normalize_email(email)?;
        validate_password(password)?;

        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|u| u.email == normalized_email && !u.is_deleted)
        {
            return Err(AuthError::Conflict(format!(
                "Email '{}' is already registered",
                normalized_email
            )));
        }

        state.next_id += 1;
        let id = state.next_id;
        let actor = created_by.unwrap_or(id);
        let now = Utc::now();
        let user = User {
            id,
            email: normalized_email,
            password_hash: hash_password(password),
            role,
            is_active: true,
            is_deleted: false,
            created_by: actor,
            created_at: now,
            updated_by: actor,
            updated_at: now,
        };
        let summary = user_to_summary(&user);
        state.users.insert(id, user);
        self.persist(&state).await?;
        Ok(summary)
    }

    /// Verify credentials; unknown email, deleted account and wrong
    /// password all fail with one indistinguishable reason
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<UserSummary, AuthError> {
        let normalized_email = normalize_email(email)
            .map_err(|_| AuthError::Unauthenticated("Invalid credentials".to_string()))?;
        let state = self.state.read().await;

        let user = state
            .users
            .values()
            .find(|u| u.email == normalized_email && !u.is_deleted)
            .ok_or_else(|| AuthError::Unauthenticated("Invalid credentials".to_string()))?;
        if !verify_password(&user.password_hash, password) {
            return Err(AuthError::Unauthenticated("Invalid credentials".to_string()));
        }
        Ok(user_to_summary(user))
    }

    pub async fn get(&self, id: i64) -> Option<UserSummary> {
        let state = self.state.read().await;
        state
            .users
            .get(&id)
            .filter(|u| !u.is_deleted)
            .map(user_to_summary)
    }

    pub async fn get_by_email(&self, email: &str) -> Option<UserSummary> {
        let normalized_email = normalize_email(email).ok()?;
        let state = self.state.read().await;
        state
            .users
            .values()
            .find(|u| u.email == normalized_email && !u.is_deleted)
            .map(user_to_summary)
    }

    /// Change a user's role; tokens already issued keep the old role
    /// until they expire
    pub async fn update_role(
        &self,
        id: i64,
        role: Role,
        actor_id: i64,
    ) -> Result<UserSummary, AuthError> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&id)
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| AuthError::NotFound(format!("User {}", id)))?;
        user.role = role;
        user.updated_by = actor_id;
        user.updated_at = Utc::now();
        let summary = user_to_summary(user);
        self.persist(&state).await?;
        Ok(summary)
    }

    /// Soft-delete a user; live tokens keep working until expiry
    pub async fn deactivate(&self, id: i64, actor_id: i64) -> Result<UserSummary, AuthError> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&id)
            .filter(|u| !u.is_deleted)
            .ok_or_else(|| AuthError::NotFound(format!("User {}", id)))?;
        user.is_active = false;
        user.is_deleted = true;
        user.updated_by = actor_id;
        user.updated_at = Utc::now();
        let summary = user_to_summary(user);
        self.persist(&state).await?;
        Ok(summary)
    }

    /// Hard-remove a user; used to roll back a partial owner+business
    /// creation within one request
    pub async fn remove(&self, id: i64) -> Result<(), AuthError> {
        let mut state = self.state.write().await;
        state
            .users
            .remove(&id)
            .ok_or_else(|| AuthError::NotFound(format!("User {}", id)))?;
        self.persist(&state).await?;
        Ok(())
    }

    pub async fn count(&self) -> usize {
        let state = self.state.read().await;
        state.users.values().filter(|u| !u.is_deleted).count()
    }
}

fn user_to_summary(user: &User) -> UserSummary {
    UserSummary {
        id: user.id,
        email: user.email.clone(),
        role: user.role,
        is_active: user.is_active,
        created_at: user.created_at,
    }
}

fn normalize_email(email: &str) -> Result<String, AuthError> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() || !normalized.contains('@') {
        return Err(AuthError::Validation("Invalid email".to_string()));
    }
    Ok(normalized)
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < 8 {
        return Err(AuthError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

fn hash_password(password: &str) -> String {
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);

    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let digest = hasher.finalize();

    format!(
        "v1${}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(digest)
    )
}

fn verify_password(stored_hash: &str, password: &str) -> bool {
    let mut parts = stored_hash.split('$');
    let version = parts.next();
    let encoded_salt = parts.next();
    let encoded_digest = parts.next();
    let (Some(encoded_salt), Some(encoded_digest)) = (encoded_salt, encoded_digest) else {
        return false;
    };
    if version != Some("v1") {
        return false;
    }

    let Ok(salt) = URL_SAFE_NO_PAD.decode(encoded_salt) else {
        return false;
    };
    let Ok(expected_digest) = URL_SAFE_NO_PAD.decode(encoded_digest) else {
        return false;
    };

    let mut hasher = Sha256::new();
    hasher.update(&salt);
    hasher.update(password.as_bytes());
    let actual_digest = hasher.finalize();
    expected_digest == actual_digest.as_slice()
}
