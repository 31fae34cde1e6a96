use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-`sid` mutex table guaranteeing at most one of
/// {start, stop, tick, delete} runs for a given student at a time.
#[derive(Default)]
pub struct SidLocks {
    table: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SidLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, sid: &str) -> OwnedMutexGuard<()> {
        let entry = {
            let mut table = self.table.lock().await;
            table.entry(sid.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        entry.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_sid_serializes() {
        let locks = Arc::new(SidLocks::new());
        let order = Arc::new(tokio::sync::Mutex::new(Vec::new()));

        let a = {
            let locks = locks.clone();
            let order = order.clone();
            tokio::spawn(async move {
                let _g = locks.lock("24111352").await;
                tokio::time::sleep(Duration::from_millis(20)).await;
                order.lock().await.push("a");
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let b = {
            let locks = locks.clone();
            let order = order.clone();
            tokio::spawn(async move {
                let _g = locks.lock("24111352").await;
                order.lock().await.push("b");
            })
        };

        a.await.unwrap();
        b.await.unwrap();
        assert_eq!(*order.lock().await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn different_sids_do_not_block_each_other() {
        let locks = SidLocks::new();
        let _a = locks.lock("a").await;
        tokio::time::timeout(Duration::from_millis(50), locks.lock("b"))
            .await
            .expect("distinct sids should not contend");
    }
}
