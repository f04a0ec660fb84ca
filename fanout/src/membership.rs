//! Chat membership resolution.
//!
//! The fan-out core only consumes membership through [`MembershipResolver`];
//! how membership is persisted or how it changes is up to the implementation.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::*;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::{ChatId, Error, UserId};

/// Answers "who participates in chat X".
///
/// Implementations must tolerate concurrent reads from the engine while
/// writes arrive from sessions and membership events.
#[async_trait]
pub trait MembershipResolver: Send + Sync {
    /// Add a user to a chat, creating the chat if needed. Idempotent.
    async fn add_participant(&self, chat_id: &str, user_id: &str) -> Result<(), Error>;

    /// Current participant set of a chat, or `NotFound` if the chat is unknown.
    async fn get_participants(&self, chat_id: &str) -> Result<HashSet<UserId>, Error>;

    /// Remove a user from a chat. `NotFound` if the chat is unknown.
    async fn remove_participant(&self, chat_id: &str, user_id: &str) -> Result<(), Error>;

    /// Join a newly connecting user to the chats their directory lists.
    ///
    /// Called by a session while registering. Resolvers backed by a store
    /// that already knows every membership can keep the default no-op.
    async fn bootstrap(&self, user_id: &str) -> Result<(), Error> {
        let _ = user_id;
        Ok(())
    }
}

/// Static user -> chats table used to bootstrap membership.
///
/// Stands in for a real chat directory service. Seed files are JSON objects
/// mapping user ids to arrays of chat ids:
///
/// ```json
/// { "user1": ["chat1", "chat2"], "user2": ["chat2"] }
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct StaticDirectory {
    users: HashMap<UserId, Vec<ChatId>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in table: `user1` and `user2` each pre-joined to `chat1`,
    /// `chat2` and `chat3`.
    pub fn reference() -> Self {
        let chats: Vec<ChatId> = ["chat1", "chat2", "chat3"]
            .iter()
            .map(|c| c.to_string())
            .collect();

        Self::new()
            .with_user("user1", chats.clone())
            .with_user("user2", chats)
    }

    pub fn with_user(mut self, user_id: impl Into<UserId>, chats: Vec<ChatId>) -> Self {
        self.users.insert(user_id.into(), chats);
        self
    }

    /// Load a directory from a JSON seed file.
    pub fn from_json_file(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Input(format!(
                "cannot read membership seed {}: {}",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&contents).map_err(|e| {
            Error::Input(format!(
                "invalid membership seed {}: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn chats_for(&self, user_id: &str) -> &[ChatId] {
        self.users.get(user_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn user_count(&self) -> usize {
        self.users.len()
    }
}

/// In-process membership store.
///
/// Each chat's participant set lives behind its own shard lock. A user is
/// bootstrapped from the [`StaticDirectory`] only the first time they
/// connect, so later removals are not undone by a reconnect.
pub struct InMemoryMembership {
    chats: DashMap<ChatId, HashSet<UserId>>,
    directory: StaticDirectory,
    bootstrapped: DashMap<UserId, ()>,
}

impl InMemoryMembership {
    pub fn new() -> Self {
        Self::with_directory(StaticDirectory::new())
    }

    pub fn with_directory(directory: StaticDirectory) -> Self {
        Self {
            chats: DashMap::new(),
            directory,
            bootstrapped: DashMap::new(),
        }
    }

    /// Number of known chats
    pub fn chat_count(&self) -> usize {
        self.chats.len()
    }

    fn join(&self, chat_id: &str, user_id: &str) {
        let added = self
            .chats
            .entry(chat_id.to_string())
            .or_default()
            .insert(user_id.to_string());

        if added {
            debug!("User {} joined chat {}", user_id, chat_id);
        }
    }
}

impl Default for InMemoryMembership {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipResolver for InMemoryMembership {
    async fn add_participant(&self, chat_id: &str, user_id: &str) -> Result<(), Error> {
        self.join(chat_id, user_id);
        Ok(())
    }

    async fn get_participants(&self, chat_id: &str) -> Result<HashSet<UserId>, Error> {
        // Clone so the shard lock is not held while the engine delivers.
        self.chats
            .get(chat_id)
            .map(|participants| participants.value().clone())
            .ok_or_else(|| Error::NotFound(format!("chat {}", chat_id)))
    }

    async fn remove_participant(&self, chat_id: &str, user_id: &str) -> Result<(), Error> {
        let mut participants = self
            .chats
            .get_mut(chat_id)
            .ok_or_else(|| Error::NotFound(format!("chat {}", chat_id)))?;

        if participants.remove(user_id) {
            debug!("User {} left chat {}", user_id, chat_id);
        }
        Ok(())
    }

    async fn bootstrap(&self, user_id: &str) -> Result<(), Error> {
        // The entry stays locked until every join is done, so a concurrent
        // bootstrap for the same user returns only once the user is joined.
        let entry = match self.bootstrapped.entry(user_id.to_string()) {
            Entry::Occupied(_) => return Ok(()),
            Entry::Vacant(entry) => entry,
        };

        let chats = self.directory.chats_for(user_id);
        for chat_id in chats {
            self.join(chat_id, user_id);
        }
        entry.insert(());

        if !chats.is_empty() {
            info!(
                "Bootstrapped user {} into {} chat(s) from directory",
                user_id,
                chats.len()
            );
        }
        Ok(())
    }
}
