//! User data access.
//!
//! `UserRepository` is the query interface handlers talk to. The in-memory
//! implementation backs the bundled server and the tests.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use futures_util::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stored user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

/// Fields to change on an existing user. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The backing store could not serve the query.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Query interface for users.
pub trait UserRepository: Send + Sync + 'static {
    /// All users, ordered by id.
    fn list(&self) -> BoxFuture<'_, RepositoryResult<Vec<User>>>;

    fn get(&self, id: u64) -> BoxFuture<'_, RepositoryResult<Option<User>>>;

    fn create(&self, name: String, email: String) -> BoxFuture<'_, RepositoryResult<User>>;

    /// Apply `patch`; `None` when the user does not exist.
    fn update(&self, id: u64, patch: UserPatch) -> BoxFuture<'_, RepositoryResult<Option<User>>>;

    /// Remove a user, returning it; `None` when it did not exist.
    fn delete(&self, id: u64) -> BoxFuture<'_, RepositoryResult<Option<User>>>;
}

/// Users kept in process memory.
#[derive(Debug)]
pub struct MemoryUserRepository {
    users: DashMap<u64, User>,
    next_id: AtomicU64,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for MemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl UserRepository for MemoryUserRepository {
    fn list(&self) -> BoxFuture<'_, RepositoryResult<Vec<User>>> {
        let mut users: Vec<User> = self.users.iter().map(|entry| entry.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        future::ready(Ok(users)).boxed()
    }

    fn get(&self, id: u64) -> BoxFuture<'_, RepositoryResult<Option<User>>> {
        let user = self.users.get(&id).map(|entry| entry.value().clone());
        future::ready(Ok(user)).boxed()
    }

    fn create(&self, name: String, email: String) -> BoxFuture<'_, RepositoryResult<User>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let user = User { id, name, email };
        self.users.insert(id, user.clone());
        future::ready(Ok(user)).boxed()
    }

    fn update(&self, id: u64, patch: UserPatch) -> BoxFuture<'_, RepositoryResult<Option<User>>> {
        let updated = self.users.get_mut(&id).map(|mut entry| {
            let user = entry.value_mut();
            if let Some(name) = patch.name {
                user.name = name;
            }
            if let Some(email) = patch.email {
                user.email = email;
            }
            user.clone()
        });
        future::ready(Ok(updated)).boxed()
    }

    fn delete(&self, id: u64) -> BoxFuture<'_, RepositoryResult<Option<User>>> {
        let removed = self.users.remove(&id).map(|(_, user)| user);
        future::ready(Ok(removed)).boxed()
    }
}
