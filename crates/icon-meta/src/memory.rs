//! In-memory metadata store for testing and ephemeral use.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use indexmap::IndexMap;

use icon_types::{IconFileKey, IconName};

use crate::error::{MetaError, MetaResult};
use crate::record::{FileRemoval, IconRecord};
use crate::traits::MetadataStore;

/// An in-memory implementation of [`MetadataStore`].
///
/// Rows live in an `IndexMap` behind a `RwLock`, which gives creation-order
/// listing for free. Data is lost when the store is dropped.
#[derive(Debug, Default)]
pub struct InMemoryMetadataStore {
    icons: RwLock<IndexMap<IconName, Vec<IconFileKey>>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of icons currently indexed.
    pub fn icon_count(&self) -> usize {
        self.icons.read().map(|icons| icons.len()).unwrap_or(0)
    }

    fn read(&self) -> MetaResult<RwLockReadGuard<'_, IndexMap<IconName, Vec<IconFileKey>>>> {
        self.icons
            .read()
            .map_err(|e| MetaError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write(&self) -> MetaResult<RwLockWriteGuard<'_, IndexMap<IconName, Vec<IconFileKey>>>> {
        self.icons
            .write()
            .map_err(|e| MetaError::Unavailable(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn get_icon(&self, name: &IconName) -> MetaResult<Option<IconRecord>> {
        let icons = self.read()?;
        Ok(icons.get(name).map(|files| IconRecord {
            name: name.clone(),
            files: files.clone(),
        }))
    }

    async fn list_icons(&self) -> MetaResult<Vec<IconRecord>> {
        let icons = self.read()?;
        Ok(icons
            .iter()
            .map(|(name, files)| IconRecord {
                name: name.clone(),
                files: files.clone(),
            })
            .collect())
    }

    async fn insert_file(&self, name: &IconName, key: &IconFileKey) -> MetaResult<()> {
        let mut icons = self.write()?;
        let files = icons.entry(name.clone()).or_default();
        if files.contains(key) {
            return Err(MetaError::AlreadyExists {
                name: name.clone(),
                key: key.clone(),
            });
        }
        files.push(key.clone());
        Ok(())
    }

    async fn delete_file(&self, name: &IconName, key: &IconFileKey) -> MetaResult<FileRemoval> {
        let mut icons = self.write()?;
        let files = icons
            .get_mut(name)
            .ok_or_else(|| MetaError::IconNotFound(name.clone()))?;
        let pos = files
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| MetaError::FileNotFound {
                name: name.clone(),
                key: key.clone(),
            })?;
        files.remove(pos);
        if files.is_empty() {
            // shift_remove keeps the creation order of the remaining icons.
            icons.shift_remove(name);
            Ok(FileRemoval::IconRemoved)
        } else {
            Ok(FileRemoval::FileRemoved)
        }
    }

    async fn reset(&self) -> MetaResult<()> {
        self.write()?.clear();
        Ok(())
    }
}
