use std::collections::BTreeMap;
use std::sync::RwLock;

use thiserror::Error;

use crate::models::{Actor, Movie};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record {0} already exists")]
    Duplicate(i64),
    #[error("record {0} not found")]
    NotFound(i64),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Id-keyed records kept in id order.
#[derive(Debug)]
pub struct Table<T> {
    rows: RwLock<BTreeMap<i64, T>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<T: Clone> Table<T> {
    pub fn list(&self) -> Vec<T> {
        let guard = self.rows.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        let guard = self.rows.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: i64) -> StoreResult<T> {
        let guard = self.rows.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    pub fn insert(&self, id: i64, row: T) -> StoreResult<()> {
        let mut guard = self.rows.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if guard.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }
        guard.insert(id, row);
        Ok(())
    }

    /// Apply `f` to the stored row and return the updated copy.
    pub fn update<F>(&self, id: i64, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut T),
    {
        let mut guard = self.rows.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        let row = guard.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        f(row);
        Ok(row.clone())
    }

    pub fn remove(&self, id: i64) -> StoreResult<T> {
        let mut guard = self.rows.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        guard.remove(&id).ok_or(StoreError::NotFound(id))
    }
}

#[derive(Debug, Default)]
pub struct CastingStore {
    pub movies: Table<Movie>,
    pub actors: Table<Actor>,
}

impl CastingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_movie(&self, movie: Movie) -> StoreResult<()> {
        self.movies.insert(movie.id, movie)
    }

    pub fn add_actor(&self, actor: Actor) -> StoreResult<()> {
        self.actors.insert(actor.id, actor)
    }
}
