//! User accounts.

use std::sync::Arc;

use dashmap::{mapref::entry::Entry, DashMap};
use serde::Serialize;

use super::error::{ConceptError, ConceptResult};
use super::store::{Doc, DocCollection, ObjectId};

/// Shown in place of users that no longer exist.
pub const DELETED_USER: &str = "DELETED_USER";

#[derive(Debug, Clone, Serialize)]
pub struct UserDoc {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Username/password accounts with unique usernames.
#[derive(Clone)]
pub struct Authing {
    users: DocCollection<UserDoc>,
    by_username: Arc<DashMap<String, ObjectId>>,
}

impl Authing {
    pub fn new(collection: &'static str) -> Self {
        Self {
            users: DocCollection::new(collection),
            by_username: Arc::new(DashMap::new()),
        }
    }

    pub fn create(&self, username: &str, password: &str) -> ConceptResult<Doc<UserDoc>> {
        if username.is_empty() || password.is_empty() {
            return Err(ConceptError::BadValues(
                "Username and password must be non-empty!".into(),
            ));
        }

        // Claim the name first so two concurrent creates cannot both win.
        let placeholder = ObjectId::new();
        match self.by_username.entry(username.to_string()) {
            Entry::Occupied(_) => return Err(already_exists(username)),
            Entry::Vacant(slot) => {
                slot.insert(placeholder);
            }
        }

        let user = self.users.create_one(UserDoc {
            username: username.to_string(),
            password: password.to_string(),
        });
        self.by_username.insert(username.to_string(), user.id.clone());
        tracing::debug!(user = %user.id, "User created");
        Ok(user)
    }

    pub fn get_user_by_id(&self, id: &ObjectId) -> ConceptResult<Doc<UserDoc>> {
        self.users
            .read_one(id)
            .ok_or_else(|| ConceptError::NotFound(format!("User {id} does not exist!")))
    }

    pub fn get_user_by_username(&self, username: &str) -> ConceptResult<Doc<UserDoc>> {
        self.by_username
            .get(username)
            .and_then(|id| self.users.read_one(id.value()))
            .ok_or_else(|| ConceptError::NotFound(format!("User {username} does not exist!")))
    }

    /// All users, or the ones whose name contains `filter`.
    pub fn get_users(&self, filter: Option<&str>) -> Vec<Doc<UserDoc>> {
        self.users
            .read_many(|u| filter.map_or(true, |f| u.username.contains(f)))
    }

    pub fn id_to_username(&self, id: &ObjectId) -> String {
        self.users
            .read_one(id)
            .map(|u| u.data.username)
            .unwrap_or_else(|| DELETED_USER.to_string())
    }

    pub fn ids_to_usernames(&self, ids: &[ObjectId]) -> Vec<String> {
        ids.iter().map(|id| self.id_to_username(id)).collect()
    }

    pub fn authenticate(&self, username: &str, password: &str) -> ConceptResult<Doc<UserDoc>> {
        match self.get_user_by_username(username) {
            Ok(user) if user.data.password == password => Ok(user),
            _ => Err(ConceptError::Unauthenticated(
                "Username or password is incorrect.".into(),
            )),
        }
    }

    pub fn update_username(&self, id: &ObjectId, username: &str) -> ConceptResult<()> {
        if username.is_empty() {
            return Err(ConceptError::BadValues("Username must be non-empty!".into()));
        }
        let current = self.get_user_by_id(id)?;
        if current.data.username == username {
            return Ok(());
        }

        match self.by_username.entry(username.to_string()) {
            Entry::Occupied(_) => return Err(already_exists(username)),
            Entry::Vacant(slot) => {
                slot.insert(id.clone());
            }
        }
        self.users
            .update_one(id, |u| u.username = username.to_string());
        self.by_username.remove(&current.data.username);
        Ok(())
    }

    pub fn update_password(
        &self,
        id: &ObjectId,
        current_password: &str,
        new_password: &str,
    ) -> ConceptResult<()> {
        if new_password.is_empty() {
            return Err(ConceptError::BadValues("Password must be non-empty!".into()));
        }
        let user = self.get_user_by_id(id)?;
        if user.data.password != current_password {
            return Err(ConceptError::NotAllowed(
                "The given current password is wrong!".into(),
            ));
        }
        self.users
            .update_one(id, |u| u.password = new_password.to_string());
        Ok(())
    }

    pub fn delete(&self, id: &ObjectId) -> ConceptResult<()> {
        let user = self
            .users
            .delete_one(id)
            .ok_or_else(|| ConceptError::NotFound(format!("User {id} does not exist!")))?;
        self.by_username.remove(&user.data.username);
        Ok(())
    }
}

fn already_exists(username: &str) -> ConceptError {
    ConceptError::AlreadyExists(format!("User with username {username} already exists!"))
}
