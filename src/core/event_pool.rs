//! 事件处理池：每个入站事件一个任务，用 Semaphore 限制并发
//!
//! 并发为 1 时即严格按到达顺序串行处理（submit 在拿到许可前阻塞轮询循环）。

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

#[derive(Clone)]
pub struct EventPool {
    semaphore: Arc<Semaphore>,
    capacity: u32,
}

impl EventPool {
    pub fn new(max_concurrent: usize) -> Self {
        let capacity = max_concurrent.clamp(1, 1024) as u32;
        Self {
            semaphore: Arc::new(Semaphore::new(capacity as usize)),
            capacity,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// 等待空闲许可后在后台执行任务
    pub async fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let Ok(permit) = self.semaphore.clone().acquire_owned().await else {
            tracing::warn!("event pool closed, dropping event");
            return;
        };
        tokio::spawn(async move {
            let _permit = permit;
            task.await;
        });
    }

    /// 等待所有在途任务完成，之后不再接受新任务
    pub async fn drain(&self) {
        if let Ok(all) = self.semaphore.acquire_many(self.capacity).await {
            all.forget();
        }
        self.semaphore.close();
    }
}

impl Default for EventPool {
    fn default() -> Self {
        Self::new(1)
    }
}
