//! The tag store: user-defined tags and their persisted mirror.
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::watch;
use uuid::Uuid;

use crate::{
    matches_text, BuiltinTag, CustomTag, KeyValueStore, NameCollisionPolicy, NotesError,
    PersistQueueStats, PersistedList, Record, Result, TagRef,
};

impl Record for CustomTag {
    fn record_id(&self) -> Uuid {
        self.id
    }
}

fn keep_insertion_order(_tags: &mut Vec<CustomTag>) {}

/// Manages the list of custom tags.
///
/// Built-in tags are not members, so they can never be deleted. Deleting a
/// custom tag leaves notes that carry a copy of it untouched.
pub struct TagStore {
    list: PersistedList<CustomTag>,
    policy: NameCollisionPolicy,
}

impl TagStore {
    /// Opens the store under `key` and starts loading persisted tags.
    pub fn open(kv: Arc<dyn KeyValueStore>, key: &str, policy: NameCollisionPolicy) -> Result<Self> {
        info!("Opening tag store under key '{}' ({:?} name collisions)", key, policy);
        let list = PersistedList::open(kv, key, keep_insertion_order)?;
        Ok(Self { list, policy })
    }

    pub fn policy(&self) -> NameCollisionPolicy {
        self.policy
    }

    /// Appends a tag. Fails only when the name collides under
    /// [`NameCollisionPolicy::Reject`].
    pub fn add(&self, tag: CustomTag) -> Result<()> {
        self.check_name(&tag.name, None)?;
        info!("Adding tag '{}' ({})", tag.name, tag.id);
        self.list.insert(tag);
        Ok(())
    }

    /// Removes the tag with `id`, if present.
    pub fn delete(&self, id: Uuid) -> Option<CustomTag> {
        let removed = self.list.remove(id);
        match &removed {
            Some(tag) => info!("Deleted tag '{}' ({})", tag.name, id),
            None => debug!("Delete ignored, no tag {}", id),
        }
        removed
    }

    /// Replaces the stored tag that has `tag.id`, keeping its position.
    ///
    /// Returns `Ok(false)` when no tag has that id.
    pub fn update(&self, tag: CustomTag) -> Result<bool> {
        if self.list.get(tag.id).is_none() {
            debug!("Update ignored, no tag {}", tag.id);
            return Ok(false);
        }
        self.check_name(&tag.name, Some(tag.id))?;

        let id = tag.id;
        let found = self.list.modify(id, |stored| *stored = tag);
        if found {
            info!("Updated tag {}", id);
        }
        Ok(found)
    }

    pub fn get(&self, id: Uuid) -> Option<CustomTag> {
        self.list.get(id)
    }

    /// First tag whose name matches, ignoring case and surrounding spaces.
    pub fn find_by_name(&self, name: &str) -> Option<CustomTag> {
        let name = name.trim().to_lowercase();
        self.list.with_records(|tags| {
            tags.iter()
                .find(|tag| tag.name.to_lowercase() == name)
                .cloned()
        })
    }

    /// Resolves a tag by exact name first, then by unique id prefix.
    pub fn resolve(&self, name_or_id: &str) -> Result<CustomTag> {
        if let Some(tag) = self.find_by_name(name_or_id) {
            return Ok(tag);
        }

        let prefix = name_or_id.trim().to_lowercase();
        if prefix.is_empty() {
            return Err(NotesError::InvalidInput {
                message: "tag name or id cannot be empty".to_string(),
            });
        }

        let mut matches: Vec<CustomTag> = self.list.with_records(|tags| {
            tags.iter()
                .filter(|tag| tag.id.to_string().starts_with(&prefix))
                .cloned()
                .collect()
        });

        match matches.len() {
            0 => Err(NotesError::TagNotFound {
                id: name_or_id.trim().to_string(),
            }),
            1 => Ok(matches.remove(0)),
            n => Err(NotesError::AmbiguousId { prefix, matches: n }),
        }
    }

    /// True when `name` matches a built-in tag or another custom tag.
    pub fn name_in_use(&self, name: &str, except: Option<Uuid>) -> bool {
        let lowered = name.trim().to_lowercase();
        BuiltinTag::ALL.iter().any(|tag| tag.matches_name(name))
            || self.list.with_records(|tags| {
                tags.iter()
                    .filter(|tag| Some(tag.id) != except)
                    .any(|tag| tag.name.trim().to_lowercase() == lowered)
            })
    }

    fn check_name(&self, name: &str, except: Option<Uuid>) -> Result<()> {
        if !self.name_in_use(name, except) {
            return Ok(());
        }

        match self.policy {
            NameCollisionPolicy::Allow => {
                debug!("Tag name '{}' is shared with another tag", name.trim());
                Ok(())
            }
            NameCollisionPolicy::Reject => {
                warn!("Rejecting tag name '{}': already in use", name.trim());
                Err(NotesError::TagNameCollision {
                    name: name.trim().to_string(),
                })
            }
        }
    }

    /// Custom tags in creation order.
    pub fn tags(&self) -> Vec<CustomTag> {
        self.list.snapshot()
    }

    /// Built-in tags followed by custom tags.
    pub fn all_tags(&self) -> Vec<TagRef> {
        BuiltinTag::ALL
            .into_iter()
            .map(TagRef::Builtin)
            .chain(self.list.snapshot().into_iter().map(TagRef::Custom))
            .collect()
    }

    /// Entries of [`TagStore::all_tags`] whose display name contains `text`,
    /// ignoring case. An empty `text` keeps every tag.
    pub fn search(&self, text: &str) -> Vec<TagRef> {
        self.all_tags()
            .into_iter()
            .filter(|tag| matches_text(tag.display_name(), text))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<CustomTag>> {
        self.list.subscribe()
    }

    pub fn is_loaded(&self) -> bool {
        self.list.is_loaded()
    }

    pub async fn wait_loaded(&self) {
        self.list.wait_loaded().await;
    }

    pub async fn flush(&self) {
        self.list.flush().await;
    }

    pub async fn shutdown(&self) {
        info!("Shutting down tag store");
        self.list.shutdown().await;
    }

    pub fn persist_stats(&self) -> PersistQueueStats {
        self.list.persist_stats()
    }
}
