//! # Actor Directory
//!
//! [`ActorDirectory`] is the system of record for actors as seen by the
//! policy engine. [`InMemoryDirectory`] is the bundled implementation,
//! used by the CLI, embedding applications and tests; a database-backed
//! implementation lives with the storage collaborator.
//!
//! ## Concurrency
//!
//! Readers share a `parking_lot::RwLock`. Every write (insert, update,
//! deactivate) runs under the single write lock, including the identity
//! uniqueness check, so two concurrent creations of the same username
//! serialize and the second one fails with
//! [`DirectoryError::DuplicateIdentity`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use geoscope_core::{ActorId, ActorStatus, Timestamp};
use parking_lot::RwLock;

use crate::actor::{validate_email, validate_username, Actor, NewActor};
use crate::error::DirectoryError;

/// Query and mutation surface over administrative actors.
pub trait ActorDirectory: Send + Sync {
    /// Fetch an actor regardless of status. For audit and lookup only;
    /// access checks go through [`ActorDirectory::get_active`].
    fn get(&self, id: ActorId) -> Result<Actor, DirectoryError>;

    /// Insert a new actor, assigning its id and timestamps.
    fn insert(&self, new_actor: NewActor) -> Result<Actor, DirectoryError>;

    /// Atomically read, modify and write one actor. The closure may reject
    /// the change; nothing is written in that case.
    fn try_update(
        &self,
        id: ActorId,
        f: &mut dyn FnMut(&mut Actor) -> Result<(), DirectoryError>,
    ) -> Result<Actor, DirectoryError>;

    /// Every actor, ordered by id.
    fn list(&self) -> Result<Vec<Actor>, DirectoryError>;

    /// Look up an actor by username (case-insensitive).
    fn find_by_username(&self, username: &str) -> Result<Option<Actor>, DirectoryError>;

    /// Fetch an actor that may take part in access decisions.
    fn get_active(&self, id: ActorId) -> Result<Actor, DirectoryError> {
        let actor = self.get(id)?;
        if actor.is_active() {
            Ok(actor)
        } else {
            Err(DirectoryError::Inactive {
                id,
                status: actor.status,
            })
        }
    }

    /// Soft delete: status becomes inactive. Already-inactive actors are
    /// returned unchanged.
    fn deactivate(&self, id: ActorId) -> Result<Actor, DirectoryError> {
        self.try_update(id, &mut |actor| {
            actor.status = ActorStatus::Inactive;
            Ok(())
        })
    }

    /// Actors matching a predicate, ordered by id.
    fn list_where(&self, predicate: &dyn Fn(&Actor) -> bool) -> Result<Vec<Actor>, DirectoryError> {
        Ok(self.list()?.into_iter().filter(|a| predicate(a)).collect())
    }
}

#[derive(Debug, Default)]
struct Inner {
    actors: BTreeMap<ActorId, Actor>,
    usernames: HashMap<String, ActorId>,
    emails: HashMap<String, ActorId>,
    last_id: i64,
}

impl Inner {
    fn claim_identity(&self, actor: &Actor, except: Option<ActorId>) -> Result<(), DirectoryError> {
        let username = identity_key(&actor.username);
        if let Some(owner) = self.usernames.get(&username) {
            if Some(*owner) != except {
                return Err(DirectoryError::DuplicateIdentity {
                    field: "username",
                    value: actor.username.clone(),
                });
            }
        }
        let email = identity_key(&actor.email);
        if let Some(owner) = self.emails.get(&email) {
            if Some(*owner) != except {
                return Err(DirectoryError::DuplicateIdentity {
                    field: "email",
                    value: actor.email.clone(),
                });
            }
        }
        Ok(())
    }

    fn index(&mut self, actor: &Actor) {
        self.usernames.insert(identity_key(&actor.username), actor.id);
        self.emails.insert(identity_key(&actor.email), actor.id);
    }

    fn unindex(&mut self, actor: &Actor) {
        self.usernames.remove(&identity_key(&actor.username));
        self.emails.remove(&identity_key(&actor.email));
    }
}

fn identity_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Thread-safe, cloneable in-memory directory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed actor, keeping its id. Used to load exported
    /// directories and to inject test fixtures.
    ///
    /// # Errors
    ///
    /// [`DirectoryError::DuplicateIdentity`] if the id, username or email
    /// is already taken.
    pub fn seed(&self, actor: Actor) -> Result<Actor, DirectoryError> {
        validate_username(&actor.username)?;
        validate_email(&actor.email)?;
        let mut inner = self.inner.write();
        if inner.actors.contains_key(&actor.id) {
            return Err(DirectoryError::DuplicateIdentity {
                field: "id",
                value: actor.id.to_string(),
            });
        }
        inner.claim_identity(&actor, None)?;
        if let Err(e) = actor.validate_assignment() {
            tracing::warn!(actor_id = %actor.id, error = %e, "seeded actor has inconsistent assignment");
        }
        inner.index(&actor);
        inner.last_id = inner.last_id.max(actor.id.get());
        inner.actors.insert(actor.id, actor.clone());
        Ok(actor)
    }

    pub fn len(&self) -> usize {
        self.inner.read().actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ActorDirectory for InMemoryDirectory {
    fn get(&self, id: ActorId) -> Result<Actor, DirectoryError> {
        self.inner
            .read()
            .actors
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NotFound(id))
    }

    fn insert(&self, new_actor: NewActor) -> Result<Actor, DirectoryError> {
        let new_actor = new_actor.normalized();
        new_actor.validate()?;

        let mut inner = self.inner.write();
        let id = ActorId::new(inner.last_id + 1)
            .map_err(|e| DirectoryError::Unavailable(format!("id sequence exhausted: {e}")))?;
        let now = Timestamp::now();
        let actor = Actor {
            id,
            username: new_actor.username,
            email: new_actor.email,
            full_name: new_actor.full_name,
            admin_level: new_actor.admin_level,
            status: ActorStatus::Active,
            assignment: new_actor.assignment,
            permissions: new_actor.permissions,
            created_by: new_actor.created_by,
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        inner.claim_identity(&actor, None)?;
        inner.index(&actor);
        inner.last_id = id.get();
        inner.actors.insert(id, actor.clone());
        tracing::debug!(actor_id = %id, level = %actor.admin_level, "actor inserted");
        Ok(actor)
    }

    fn try_update(
        &self,
        id: ActorId,
        f: &mut dyn FnMut(&mut Actor) -> Result<(), DirectoryError>,
    ) -> Result<Actor, DirectoryError> {
        let mut inner = self.inner.write();
        let current = inner.actors.get(&id).cloned().ok_or(DirectoryError::NotFound(id))?;

        let mut updated = current.clone();
        f(&mut updated)?;
        updated.id = id;
        validate_username(&updated.username)?;
        validate_email(&updated.email)?;
        inner.claim_identity(&updated, Some(id))?;
        if updated == current {
            return Ok(current);
        }
        updated.updated_at = Timestamp::now();

        inner.unindex(&current);
        inner.index(&updated);
        inner.actors.insert(id, updated.clone());
        Ok(updated)
    }

    fn list(&self) -> Result<Vec<Actor>, DirectoryError> {
        Ok(self.inner.read().actors.values().cloned().collect())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<Actor>, DirectoryError> {
        let inner = self.inner.read();
        Ok(inner
            .usernames
            .get(&identity_key(username))
            .and_then(|id| inner.actors.get(id))
            .cloned())
    }
}
