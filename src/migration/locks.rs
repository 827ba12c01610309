//! Per-table mutual exclusion
//!
//! DDL against the same table is serialized; different tables proceed
//! independently. Owned by one `MigrationManager`, never global.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct TableLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TableLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `table`; released when the guard drops
    pub async fn acquire(&self, table: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(table.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_table_is_exclusive() {
        let locks = Arc::new(TableLocks::new());
        let guard = locks.acquire("users").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("users").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // other tables are not blocked
        let _posts = locks.acquire("posts").await;

        drop(guard);
        contender.await.unwrap();
        assert_eq!(locks.len().await, 2);
    }
}
