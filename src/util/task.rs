use std::collections::HashMap;
use tokio::task::JoinHandle;

#[derive(Default)]
pub struct TaskManager {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            tasks: HashMap::new(),
        }
    }

    /// Runs `task` under `key`, aborting whatever ran under it before.
    pub fn spawn(&mut self, key: &str, task: JoinHandle<()>) {
        if let Some(handle) = self.tasks.insert(key.to_string(), task) {
            handle.abort();
        }
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.tasks.get(key).is_some_and(|h| !h.is_finished())
    }

    pub fn abort(&mut self, key: &str) {
        if let Some(handle) = self.tasks.remove(key) {
            handle.abort();
        }
    }

    pub fn abort_all(&mut self) {
        for handle in self.tasks.values() {
            handle.abort();
        }
        self.tasks.clear();
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Repeating task that lives exactly as long as its guard.
pub struct TaskGuard {
    handle: JoinHandle<()>,
}

impl TaskGuard {
    pub fn new(handle: JoinHandle<()>) -> Self {
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn respawn_aborts_previous_task() {
        let mut tasks = TaskManager::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        tasks.spawn(
            "fetch",
            tokio::spawn(async move {
                let _tx = tx;
                std::future::pending::<()>().await;
            }),
        );
        tasks.spawn("fetch", tokio::spawn(async {}));

        // sender is dropped once the first task is aborted
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn abort_removes_the_task() {
        let mut tasks = TaskManager::new();
        tasks.spawn("lyrics", tokio::spawn(std::future::pending::<()>()));
        assert!(tasks.is_active("lyrics"));

        tasks.abort("lyrics");
        assert!(!tasks.is_active("lyrics"));
        tasks.abort("missing");
    }

    #[tokio::test]
    async fn guard_aborts_on_drop() {
        let guard = TaskGuard::new(tokio::spawn(std::future::pending::<()>()));
        assert!(!guard.is_finished());
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let other = TaskGuard::new(tokio::spawn(async move {
            let _tx = tx;
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }));
        drop(other);
        assert!(rx.await.is_err());
        drop(guard);
    }
}
