//! 通知轮询器
//!
//! 按固定周期扫描存储中到期的通知并逐条交给调度器：
//! 每轮先取最多 batch_size 条新就绪（CREATED 且 scheduled_at 到期），
//! 再取最多 batch_size 条待重试（FAILED 且 next_retry_at 到期），
//! 两类各自独立封顶，单轮最多调度 2 × batch_size 条。
//! 两类都为空时本轮不触碰调度器。

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::dispatcher::Dispatch;
use crate::repository::NotificationRepositoryTrait;
use notify_shared::error::Result;

/// 通知轮询器
pub struct NotificationPoller {
    repo: Arc<dyn NotificationRepositoryTrait>,
    dispatcher: Arc<dyn Dispatch>,
    batch_size: i64,
    poll_interval: Duration,
}

impl NotificationPoller {
    pub fn new(
        repo: Arc<dyn NotificationRepositoryTrait>,
        dispatcher: Arc<dyn Dispatch>,
        batch_size: i64,
        poll_interval: Duration,
    ) -> Self {
        Self {
            repo,
            dispatcher,
            batch_size,
            poll_interval,
        }
    }

    /// 启动轮询循环，直到收到 shutdown 信号
    ///
    /// 单轮出错（如数据库暂不可用）只记录日志，循环继续。
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        // 单轮耗时超过周期时顺延，而不是补发积压的 tick
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_ms = self.poll_interval.as_millis() as u64,
            batch_size = self.batch_size,
            "通知轮询器已启动"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        error!(error = %e, "本轮轮询失败");
                    }
                }
                changed = shutdown.changed() => {
                    // 发送端被丢弃同样视为关闭
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("通知轮询器已停止");
    }

    /// 执行一轮选取与调度
    pub async fn poll_once(&self) -> Result<()> {
        let now = Utc::now();

        let ready = self.repo.find_ready(now, self.batch_size).await?;
        let retry = self.repo.find_retry_due(now, self.batch_size).await?;

        if ready.is_empty() && retry.is_empty() {
            return Ok(());
        }

        info!(
            total = ready.len() + retry.len(),
            new = ready.len(),
            retry = retry.len(),
            "开始处理到期通知"
        );

        // 先调度新就绪批次，再调度重试批次；
        // 单条失败不能中断本轮其余通知的调度
        for notification in ready.into_iter().chain(retry) {
            let id = notification.id;
            if let Err(e) = self.dispatcher.dispatch(notification).await {
                error!(notification_id = id, error = %e, "调度单条通知失败，继续处理后续");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::MockDispatch;
    use crate::models::{ChannelType, Notification, NotificationPriority};
    use crate::repository::traits::MockNotificationRepositoryTrait;
    use async_trait::async_trait;
    use notify_shared::error::NotifyError;
    use std::sync::Mutex;

    fn make_notification(id: i64) -> Notification {
        let mut n = Notification::build(
            1,
            ChannelType::Email,
            "hello".to_string(),
            NotificationPriority::Medium,
            None,
            None,
            3,
        );
        n.id = id;
        n
    }

    /// 按顺序记录被调度的通知 id，可对指定 id 模拟失败
    #[derive(Default)]
    struct RecordingDispatcher {
        dispatched: Mutex<Vec<i64>>,
        fail_ids: Vec<i64>,
    }

    #[async_trait]
    impl Dispatch for RecordingDispatcher {
        async fn dispatch(&self, notification: Notification) -> Result<()> {
            self.dispatched.lock().unwrap().push(notification.id);
            if self.fail_ids.contains(&notification.id) {
                return Err(NotifyError::Internal("存根调度失败".to_string()));
            }
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_empty_poll_never_invokes_dispatcher() {
        let mut repo = MockNotificationRepositoryTrait::new();
        repo.expect_find_ready().returning(|_, _| Ok(vec![]));
        repo.expect_find_retry_due().returning(|_, _| Ok(vec![]));

        let mut dispatcher = MockDispatch::new();
        // 两类查询都为空时绝不能调用调度器
        dispatcher.expect_dispatch().times(0);

        let poller = NotificationPoller::new(
            Arc::new(repo),
            Arc::new(dispatcher),
            10,
            Duration::from_millis(100),
        );

        poller.poll_once().await.unwrap();
    }

    #[tokio::test]
    async fn test_ready_batch_dispatched_before_retry_batch() {
        let mut repo = MockNotificationRepositoryTrait::new();
        repo.expect_find_ready()
            .returning(|_, _| Ok(vec![make_notification(1), make_notification(2)]));
        repo.expect_find_retry_due()
            .returning(|_, _| Ok(vec![make_notification(3)]));

        let dispatcher = Arc::new(RecordingDispatcher::default());
        let poller = NotificationPoller::new(
            Arc::new(repo),
            dispatcher.clone(),
            10,
            Duration::from_millis(100),
        );

        poller.poll_once().await.unwrap();

        // 新就绪批次在前，重试批次在后，保持选取顺序
        assert_eq!(*dispatcher.dispatched.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_batch_size_passed_to_both_queries() {
        let mut repo = MockNotificationRepositoryTrait::new();
        repo.expect_find_ready()
            .withf(|_, limit| *limit == 7)
            .times(1)
            .returning(|_, _| Ok(vec![]));
        repo.expect_find_retry_due()
            .withf(|_, limit| *limit == 7)
            .times(1)
            .returning(|_, _| Ok(vec![]));

        let poller = NotificationPoller::new(
            Arc::new(repo),
            Arc::new(MockDispatch::new()),
            7,
            Duration::from_millis(100),
        );

        poller.poll_once().await.unwrap();
    }

    #[tokio::test]
    async fn test_single_dispatch_failure_does_not_abort_batch() {
        let mut repo = MockNotificationRepositoryTrait::new();
        repo.expect_find_ready().returning(|_, _| {
            Ok(vec![
                make_notification(1),
                make_notification(2),
                make_notification(3),
            ])
        });
        repo.expect_find_retry_due().returning(|_, _| Ok(vec![]));

        // id=2 调度失败，其余照常处理
        let dispatcher = Arc::new(RecordingDispatcher {
            fail_ids: vec![2],
            ..Default::default()
        });
        let poller = NotificationPoller::new(
            Arc::new(repo),
            dispatcher.clone(),
            10,
            Duration::from_millis(100),
        );

        poller.poll_once().await.unwrap();

        assert_eq!(*dispatcher.dispatched.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown_signal() {
        let mut repo = MockNotificationRepositoryTrait::new();
        repo.expect_find_ready().returning(|_, _| Ok(vec![]));
        repo.expect_find_retry_due().returning(|_, _| Ok(vec![]));

        let poller = Arc::new(NotificationPoller::new(
            Arc::new(repo),
            Arc::new(MockDispatch::new()),
            10,
            Duration::from_millis(10),
        ));

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(poller.run(rx));

        // 让循环跑几轮后发出关闭信号
        tokio::time::sleep(Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("轮询循环应在关闭信号后退出")
            .unwrap();
    }
}
