//! Device-local store used when no backend is reachable.
//!
//! Implements the same contract as the authoritative store, backed by a
//! sled database on the device. Also holds the owner's bookmark list: a
//! lightweight `{token, displayName, createdAt}` pointer per created page,
//! with a lifecycle fully independent of the records themselves.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Db;

use crate::token;

use super::{build_record, create_with_fresh_token, StoreError, TipPage, TipPageInput, TipPageStore};

const TIP_PAGES_TREE: &str = "tip_pages";
const TIP_LINKS_TREE: &str = "tip_links";

/// Bookmark for a page this device created. Deleting one never deletes
/// the record it points to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkBookmark {
    pub token: String,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

pub struct LocalStore {
    db: Db,
}

impl LocalStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// Remember a created page in the "my links" list.
    pub fn add_link(&self, bookmark: &LinkBookmark) -> Result<(), StoreError> {
        let tree = self.db.open_tree(TIP_LINKS_TREE)?;
        let bytes = serde_json::to_vec(bookmark)?;
        tree.insert(bookmark.token.as_bytes(), bytes)?;
        tree.flush()?;
        Ok(())
    }

    /// All bookmarks, newest first.
    pub fn links(&self) -> Result<Vec<LinkBookmark>, StoreError> {
        let tree = self.db.open_tree(TIP_LINKS_TREE)?;
        let mut links = Vec::new();
        for entry in tree.iter() {
            let (_, value) = entry?;
            links.push(serde_json::from_slice::<LinkBookmark>(&value)?);
        }
        links.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(links)
    }

    /// Drop a bookmark. The record stays readable by token.
    pub fn remove_link(&self, token: &str) -> Result<(), StoreError> {
        let tree = self.db.open_tree(TIP_LINKS_TREE)?;
        tree.remove(token.as_bytes())?;
        tree.flush()?;
        Ok(())
    }
}

impl TipPageStore for LocalStore {
    fn create(&self, input: TipPageInput) -> Result<String, StoreError> {
        let record = build_record(input)?;
        let tree = self.db.open_tree(TIP_PAGES_TREE)?;
        let token = create_with_fresh_token(&record, |token, record| {
            let bytes = serde_json::to_vec(record)?;
            // compare_and_swap against absence: an existing record is a
            // collision, never an overwrite.
            match tree.compare_and_swap(
                token.as_bytes(),
                None as Option<&[u8]>,
                Some(bytes),
            )? {
                Ok(()) => Ok(true),
                Err(_) => Ok(false),
            }
        })?;
        tree.flush()?;
        Ok(token)
    }

    fn get(&self, token: &str) -> Result<TipPage, StoreError> {
        if !token::is_well_formed(token) {
            return Err(StoreError::NotFound);
        }
        let tree = self.db.open_tree(TIP_PAGES_TREE)?;
        match tree.get(token.as_bytes())? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Err(StoreError::NotFound),
        }
    }
}
