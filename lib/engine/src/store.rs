//! The entity store: the tag → instance map and the cluster index, kept in
//! lockstep.
//!
//! Every mutation writes the cluster index first and touches the map only
//! once the index has accepted the change. Indexes are all-or-nothing, so a
//! failed call leaves both sides exactly as they were.
//!
//! Multi-item writes go through [`EntityStore::batch`], which records the
//! prior state of every tag it touches and restores it, newest first, when
//! a later item fails.

use ahash::AHashMap;
use matchx_cluster::{ClusterIndex, ClusterSummary};
use matchx_core::{Embedding, Instance, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error};

/// Owned copy of both sides of the store, for comparisons and diagnostics
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub instances: BTreeMap<String, Instance>,
    pub index_tags: BTreeSet<String>,
}

impl StoreSnapshot {
    /// Both sides know exactly the same tags
    pub fn is_consistent(&self) -> bool {
        self.instances.len() == self.index_tags.len()
            && self.instances.keys().all(|tag| self.index_tags.contains(tag))
    }
}

pub struct EntityStore {
    instances: AHashMap<String, Instance>,
    index: Box<dyn ClusterIndex>,
}

impl EntityStore {
    pub fn new(index: Box<dyn ClusterIndex>) -> Self {
        Self {
            instances: AHashMap::new(),
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.instances.contains_key(tag)
    }

    pub fn get(&self, tag: &str) -> Option<&Instance> {
        self.instances.get(tag)
    }

    pub fn index(&self) -> &dyn ClusterIndex {
        self.index.as_ref()
    }

    /// Tags in cluster-index order
    pub fn tags(&self) -> Vec<String> {
        self.index.tags()
    }

    pub fn clusters(&self) -> Vec<ClusterSummary> {
        self.index.clusters()
    }

    /// Insert a new entity, or replace an existing one
    pub fn upsert(&mut self, tag: &str, instance: Instance) -> Result<()> {
        if self.instances.contains_key(tag) {
            self.index.update(tag, instance.embedding())?;
            debug!(tag, "replaced entity");
        } else {
            self.index.ingest(tag, instance.embedding())?;
            debug!(tag, "added entity");
        }
        self.instances.insert(tag.to_string(), instance);
        Ok(())
    }

    /// Replace an existing entity. Returns `false`, touching nothing, when
    /// the tag is absent.
    pub fn replace(&mut self, tag: &str, instance: Instance) -> Result<bool> {
        if !self.instances.contains_key(tag) {
            return Ok(false);
        }
        self.index.update(tag, instance.embedding())?;
        self.instances.insert(tag.to_string(), instance);
        debug!(tag, "updated entity");
        Ok(true)
    }

    /// Remove an entity, returning it. `None` when the tag is absent.
    pub fn remove(&mut self, tag: &str) -> Result<Option<Instance>> {
        if !self.instances.contains_key(tag) {
            return Ok(None);
        }
        self.index.remove(tag)?;
        debug!(tag, "removed entity");
        Ok(self.instances.remove(tag))
    }

    /// Stored entities sharing the cluster `embedding` would join.
    ///
    /// Tags the index reports but the map does not hold are skipped.
    pub fn candidates(&self, embedding: &Embedding) -> Result<Vec<(String, &Instance)>> {
        if self.instances.is_empty() {
            return Ok(Vec::new());
        }

        let cluster = self.index.predict(embedding)?;
        let tags = self.index.tags_in_cluster(cluster)?;

        Ok(tags
            .into_iter()
            .filter_map(|tag| match self.instances.get(&tag) {
                Some(instance) => Some((tag, instance)),
                None => {
                    debug!(tag = %tag, cluster, "index tag missing from store, skipping");
                    None
                }
            })
            .collect())
    }

    /// Run `f` against the store as one unit. If `f` fails, every write it
    /// made is undone before the error is returned.
    pub fn batch<T>(&mut self, f: impl FnOnce(&mut Batch<'_>) -> Result<T>) -> Result<T> {
        let mut batch = Batch {
            store: self,
            undo: Vec::new(),
        };
        match f(&mut batch) {
            Ok(value) => Ok(value),
            Err(e) => {
                batch.rollback();
                Err(e)
            }
        }
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            instances: self
                .instances
                .iter()
                .map(|(tag, instance)| (tag.clone(), instance.clone()))
                .collect(),
            index_tags: self.index.tags().into_iter().collect(),
        }
    }
}

/// Writes made inside [`EntityStore::batch`], each paired with the state it
/// replaced
pub struct Batch<'a> {
    store: &'a mut EntityStore,
    undo: Vec<(String, Option<Instance>)>,
}

impl Batch<'_> {
    pub fn upsert(&mut self, tag: &str, instance: Instance) -> Result<()> {
        let previous = self.store.get(tag).cloned();
        self.store.upsert(tag, instance)?;
        self.undo.push((tag.to_string(), previous));
        Ok(())
    }

    pub fn replace(&mut self, tag: &str, instance: Instance) -> Result<bool> {
        let Some(previous) = self.store.get(tag).cloned() else {
            return Ok(false);
        };
        self.store.replace(tag, instance)?;
        self.undo.push((tag.to_string(), Some(previous)));
        Ok(true)
    }

    pub fn remove(&mut self, tag: &str) -> Result<bool> {
        match self.store.remove(tag)? {
            Some(previous) => {
                self.undo.push((tag.to_string(), Some(previous)));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn rollback(self) {
        let undone = self.undo.len();
        for (tag, previous) in self.undo.into_iter().rev() {
            let restored = match previous {
                Some(instance) => self.store.upsert(&tag, instance),
                None => self.store.remove(&tag).map(|_| ()),
            };
            if let Err(e) = restored {
                error!(tag = %tag, error = %e, "rollback failed, store may be inconsistent");
            }
        }
        debug!(writes = undone, "batch rolled back");
    }
}
