use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Id-indexed rows, each behind its own lock.
///
/// The outer `RwLock` only guards membership; holding a row's `Mutex` is
/// what serializes writers of that aggregate.
#[derive(Debug)]
pub struct Table<T> {
    rows: RwLock<HashMap<Uuid, Arc<Mutex<T>>>>,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> Table<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, id: Uuid, value: T) -> Arc<Mutex<T>> {
        let row = Arc::new(Mutex::new(value));
        self.rows.write().await.insert(id, Arc::clone(&row));
        row
    }

    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<T>>> {
        self.rows.read().await.get(&id).cloned()
    }

    pub async fn contains(&self, id: Uuid) -> bool {
        self.rows.read().await.contains_key(&id)
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Row handles at this instant. Rows inserted afterwards are not included.
    pub async fn handles(&self) -> Vec<Arc<Mutex<T>>> {
        self.rows.read().await.values().cloned().collect()
    }
}

impl<T: Clone> Table<T> {
    pub async fn snapshot(&self, id: Uuid) -> Option<T> {
        let row = self.get(id).await?;
        let guard = row.lock().await;
        Some(guard.clone())
    }

    /// Copies of every row matching `pred`, each read under its own lock.
    pub async fn select<F>(&self, mut pred: F) -> Vec<T>
    where
        F: FnMut(&T) -> bool,
    {
        let mut out = Vec::new();
        for row in self.handles().await {
            let guard = row.lock().await;
            if pred(&guard) {
                out.push(guard.clone());
            }
        }
        out
    }
}
