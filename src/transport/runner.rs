//! 轮询主循环：getUpdates → 事件 → EventPool → Dispatcher
//!
//! 收到关闭信号后停止拉取，等待在途事件完成。

use std::sync::Arc;
use std::time::Duration;

use crate::core::{EventPool, ShutdownManager};
use crate::dispatch::Dispatcher;
use crate::transport::TelegramClient;

/// getUpdates 失败后的等待时间
const POLL_ERROR_DELAY: Duration = Duration::from_secs(3);

pub async fn run_polling(
    client: Arc<TelegramClient>,
    dispatcher: Arc<Dispatcher>,
    pool: EventPool,
    shutdown: Arc<ShutdownManager>,
) {
    let mut offset = 0i64;
    tracing::info!(concurrency = pool.capacity(), "polling for Telegram updates");

    loop {
        let updates = tokio::select! {
            _ = shutdown.wait_for_shutdown() => break,
            result = client.get_updates(offset) => result,
        };

        let updates = match updates {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!(error = %e, "getUpdates failed");
                tokio::select! {
                    _ = shutdown.wait_for_shutdown() => break,
                    _ = tokio::time::sleep(POLL_ERROR_DELAY) => continue,
                }
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some((event, callback_id)) = update.into_event() else {
                continue;
            };

            let client = Arc::clone(&client);
            let dispatcher = Arc::clone(&dispatcher);
            pool.submit(async move {
                if let Some(id) = callback_id {
                    if let Err(e) = client.answer_callback(&id).await {
                        tracing::debug!(error = %e, "answerCallbackQuery failed");
                    }
                }
                dispatcher.handle_guarded(event, client.as_ref()).await;
            })
            .await;
        }
    }

    tracing::info!("polling stopped, waiting for in-flight events");
    pool.drain().await;
}
