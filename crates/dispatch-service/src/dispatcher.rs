//! 通知调度器
//!
//! 驱动单条通知的状态机：标记 PROCESSING、解析渠道、带超时执行发送，
//! 并把成功 / 循环排期 / 失败结果作为单次原子写入落库。
//! 普通发送失败永远不会向调用方抛出，而是被转化为状态迁移；
//! 只有基础设施故障（持久化写入失败）才向上传播。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::channel::ChannelRegistry;
use crate::models::{Notification, NotificationStatus};
use crate::repository::NotificationRepositoryTrait;
use crate::retry::backoff_delay;
use notify_shared::error::{NotifyError, Result};

/// 调度能力抽象
///
/// 轮询器依赖该 trait 而非具体实现，便于 mock 测试，
/// 也为将来换成并发工作池实现留出接缝。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Dispatch: Send + Sync {
    async fn dispatch(&self, notification: Notification) -> Result<()>;
}

/// 通知调度器
pub struct NotificationDispatcher {
    repo: Arc<dyn NotificationRepositoryTrait>,
    registry: Arc<ChannelRegistry>,
    /// 单次发送的超时时间，超时按普通发送失败处理
    send_timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(
        repo: Arc<dyn NotificationRepositoryTrait>,
        registry: Arc<ChannelRegistry>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            registry,
            send_timeout,
        }
    }

    /// 成功路径：循环通知回到 CREATED 并重新排期，否则进入 SENT 终态
    async fn handle_success(&self, mut notification: Notification) -> Result<()> {
        if let Some(interval) = notification.recurrence_interval_minutes {
            info!(
                notification_id = notification.id,
                interval_minutes = interval,
                "循环通知发送成功，重新排期"
            );

            notification.status = NotificationStatus::Created;
            notification.scheduled_at = Utc::now() + chrono::Duration::minutes(interval);
            notification.retry_count = 0;
            notification.next_retry_at = None;
        } else {
            notification.status = NotificationStatus::Sent;
            // 重试成功的记录带着 next_retry_at 进来，终态必须清空
            notification.next_retry_at = None;
        }

        self.repo.update(&notification).await
    }

    /// 失败路径：递增重试计数，耗尽后进入死信，否则按指数退避安排重试
    async fn handle_failure(&self, mut notification: Notification) -> Result<()> {
        notification.retry_count += 1;

        warn!(
            notification_id = notification.id,
            attempt = notification.retry_count,
            max_retries = notification.max_retries,
            "通知发送失败"
        );

        if notification.retry_count > notification.max_retries {
            notification.status = NotificationStatus::DeadLetter;
            notification.next_retry_at = None;

            warn!(
                notification_id = notification.id,
                "重试次数已耗尽，通知进入死信状态，等待人工处理"
            );
        } else {
            notification.status = NotificationStatus::Failed;

            let delay = backoff_delay(notification.retry_count);
            notification.next_retry_at = Some(Utc::now() + delay);

            info!(
                notification_id = notification.id,
                next_retry_at = ?notification.next_retry_at,
                "已安排重试"
            );
        }

        self.repo.update(&notification).await
    }
}

#[async_trait]
impl Dispatch for NotificationDispatcher {
    async fn dispatch(&self, mut notification: Notification) -> Result<()> {
        info!(
            notification_id = notification.id,
            channel = %notification.channel_type,
            "开始调度通知"
        );

        // 先持久化 PROCESSING，发送期间崩溃会以"卡在 PROCESSING"
        // 的形式暴露给运维，而不是静默丢失
        notification.status = NotificationStatus::Processing;
        self.repo.update(&notification).await?;

        // 渠道解析失败对该记录是致命的：不走重试路径，
        // 记录保持 PROCESSING 等待人工处理
        let channel = match self.registry.resolve(notification.channel_type) {
            Ok(channel) => channel,
            Err(e) => {
                error!(
                    notification_id = notification.id,
                    channel = %notification.channel_type,
                    "未注册该渠道的实现，通知保持 PROCESSING 状态"
                );
                return Err(e);
            }
        };

        // 终端缺失、服务商拒绝、发送超时走同一条失败路径
        let send_result = match tokio::time::timeout(
            self.send_timeout,
            channel.send(&notification),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(NotifyError::SendTimeout {
                channel: notification.channel_type.to_string(),
            }),
        };

        match send_result {
            Ok(()) => {
                info!(
                    notification_id = notification.id,
                    channel = %notification.channel_type,
                    "通知发送成功"
                );
                self.handle_success(notification).await
            }
            Err(e) => {
                error!(
                    notification_id = notification.id,
                    error = %e,
                    "通知发送出错"
                );
                self.handle_failure(notification).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::NotificationChannel;
    use crate::models::{ChannelType, NotificationPriority};
    use chrono::{DateTime, Duration as ChronoDuration};
    use std::sync::Mutex;

    // -----------------------------------------------------------------------
    // 测试替身
    // -----------------------------------------------------------------------

    /// 记录每次 update 写入的存根仓储
    #[derive(Default)]
    struct RecordingRepo {
        updates: Mutex<Vec<Notification>>,
        /// 为 true 时 update 返回数据库错误，模拟基础设施故障
        fail_updates: bool,
    }

    impl RecordingRepo {
        fn updates(&self) -> Vec<Notification> {
            self.updates.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NotificationRepositoryTrait for RecordingRepo {
        async fn create(&self, _n: &Notification) -> Result<Notification> {
            unreachable!("调度器不创建通知")
        }

        async fn create_batch(&self, _n: &[Notification]) -> Result<Vec<Notification>> {
            unreachable!("调度器不创建通知")
        }

        async fn find_by_id(&self, _id: i64) -> Result<Option<Notification>> {
            Ok(None)
        }

        async fn update(&self, notification: &Notification) -> Result<()> {
            if self.fail_updates {
                return Err(NotifyError::Database(sqlx::Error::PoolTimedOut));
            }
            self.updates.lock().unwrap().push(notification.clone());
            Ok(())
        }

        async fn find_ready(
            &self,
            _now: DateTime<Utc>,
            _limit: i64,
        ) -> Result<Vec<Notification>> {
            Ok(vec![])
        }

        async fn find_retry_due(
            &self,
            _now: DateTime<Utc>,
            _limit: i64,
        ) -> Result<Vec<Notification>> {
            Ok(vec![])
        }

        async fn list_by_user(
            &self,
            _user_id: i64,
            _status: Option<NotificationStatus>,
            _page: i64,
            _size: i64,
        ) -> Result<Vec<Notification>> {
            Ok(vec![])
        }

        async fn count_by_user(
            &self,
            _user_id: i64,
            _status: Option<NotificationStatus>,
        ) -> Result<i64> {
            Ok(0)
        }
    }

    /// 发送行为可配置的存根渠道
    enum SendBehavior {
        Succeed,
        Fail,
        /// 睡眠指定时长后成功，用于触发调度器的发送超时
        Stall(Duration),
    }

    struct StubChannel {
        channel_type: ChannelType,
        behavior: SendBehavior,
    }

    #[async_trait]
    impl NotificationChannel for StubChannel {
        fn supported_channel(&self) -> ChannelType {
            self.channel_type
        }

        async fn send(&self, _notification: &Notification) -> Result<()> {
            match &self.behavior {
                SendBehavior::Succeed => Ok(()),
                SendBehavior::Fail => Err(NotifyError::SendFailed {
                    channel: self.channel_type.to_string(),
                    reason: "存根故障".to_string(),
                }),
                SendBehavior::Stall(duration) => {
                    tokio::time::sleep(*duration).await;
                    Ok(())
                }
            }
        }

        fn validate_endpoint(&self, _endpoint_value: &str) -> Result<()> {
            Ok(())
        }
    }

    fn make_dispatcher(
        behavior: SendBehavior,
        send_timeout: Duration,
    ) -> (Arc<RecordingRepo>, NotificationDispatcher) {
        let repo = Arc::new(RecordingRepo::default());
        let registry = Arc::new(ChannelRegistry::new(vec![Arc::new(StubChannel {
            channel_type: ChannelType::Email,
            behavior,
        })]));
        let dispatcher =
            NotificationDispatcher::new(repo.clone(), registry, send_timeout);
        (repo, dispatcher)
    }

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

    fn assert_close_to(actual: DateTime<Utc>, expected: DateTime<Utc>) {
        let diff = (actual - expected).num_seconds().abs();
        assert!(diff < 5, "时间偏差过大: {diff}s");
    }

    // -----------------------------------------------------------------------
    // 成功路径
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_success_without_recurrence_ends_sent() {
        let (repo, dispatcher) =
            make_dispatcher(SendBehavior::Succeed, Duration::from_secs(5));

        dispatcher.dispatch(make_notification(1)).await.unwrap();

        let updates = repo.updates();
        // 第一次写入 PROCESSING，第二次写入终态
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].status, NotificationStatus::Processing);
        assert_eq!(updates[1].status, NotificationStatus::Sent);
        assert!(updates[1].next_retry_at.is_none());
        assert_eq!(updates[1].retry_count, 0);
    }

    #[tokio::test]
    async fn test_success_with_recurrence_reschedules() {
        let (repo, dispatcher) =
            make_dispatcher(SendBehavior::Succeed, Duration::from_secs(5));

        let mut notification = make_notification(2);
        notification.recurrence_interval_minutes = Some(15);
        // 模拟此前经历过失败的循环通知
        notification.retry_count = 2;

        dispatcher.dispatch(notification).await.unwrap();

        let updates = repo.updates();
        let last = updates.last().unwrap();
        assert_eq!(last.status, NotificationStatus::Created);
        assert_eq!(last.retry_count, 0);
        assert!(last.next_retry_at.is_none());
        assert_close_to(last.scheduled_at, Utc::now() + ChronoDuration::minutes(15));
    }

    #[tokio::test]
    async fn test_retry_success_clears_next_retry_at() {
        let (repo, dispatcher) =
            make_dispatcher(SendBehavior::Succeed, Duration::from_secs(5));

        // 来自重试队列的记录：此前失败过，带着下次重试时间
        let mut notification = make_notification(8);
        notification.status = NotificationStatus::Failed;
        notification.retry_count = 1;
        notification.next_retry_at = Some(Utc::now() - ChronoDuration::minutes(1));

        dispatcher.dispatch(notification).await.unwrap();

        let last = repo.updates().last().unwrap().clone();
        assert_eq!(last.status, NotificationStatus::Sent);
        // SENT 终态不得残留下次重试时间
        assert!(last.next_retry_at.is_none());
    }

    // -----------------------------------------------------------------------
    // 失败路径：max_retries = 3 的完整阶梯
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_failure_schedules_exponential_backoff() {
        // (调度前的 retry_count, 期望的 retry_count, 期望的退避分钟数)
        let ladder = [(0, 1, 1), (1, 2, 2), (2, 3, 4)];

        for (before, after, minutes) in ladder {
            let (repo, dispatcher) =
                make_dispatcher(SendBehavior::Fail, Duration::from_secs(5));

            let mut notification = make_notification(3);
            notification.retry_count = before;

            dispatcher.dispatch(notification).await.unwrap();

            let last = repo.updates().last().unwrap().clone();
            assert_eq!(last.status, NotificationStatus::Failed);
            assert_eq!(last.retry_count, after);
            assert_close_to(
                last.next_retry_at.expect("FAILED 状态必有下次重试时间"),
                Utc::now() + ChronoDuration::minutes(minutes),
            );
        }
    }

    #[tokio::test]
    async fn test_failure_exhausts_retries_into_dead_letter() {
        let (repo, dispatcher) =
            make_dispatcher(SendBehavior::Fail, Duration::from_secs(5));

        let mut notification = make_notification(4);
        // 第 4 次尝试：retry_count 将变为 4 > max_retries = 3
        notification.retry_count = 3;

        dispatcher.dispatch(notification).await.unwrap();

        let last = repo.updates().last().unwrap().clone();
        assert_eq!(last.status, NotificationStatus::DeadLetter);
        assert_eq!(last.retry_count, 4);
        assert!(last.next_retry_at.is_none());
    }

    // -----------------------------------------------------------------------
    // 超时与渠道解析
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_send_timeout_routes_to_failure_path() {
        let (repo, dispatcher) = make_dispatcher(
            SendBehavior::Stall(Duration::from_millis(200)),
            Duration::from_millis(20),
        );

        dispatcher.dispatch(make_notification(5)).await.unwrap();

        let last = repo.updates().last().unwrap().clone();
        assert_eq!(last.status, NotificationStatus::Failed);
        assert_eq!(last.retry_count, 1);
        assert!(last.next_retry_at.is_some());
    }

    #[tokio::test]
    async fn test_unresolved_channel_leaves_record_processing() {
        // 注册表为空：任何渠道都解析失败
        let repo = Arc::new(RecordingRepo::default());
        let registry = Arc::new(ChannelRegistry::new(vec![]));
        let dispatcher =
            NotificationDispatcher::new(repo.clone(), registry, Duration::from_secs(5));

        let err = dispatcher
            .dispatch(make_notification(6))
            .await
            .expect_err("渠道解析失败应向上传播");
        assert!(matches!(err, NotifyError::UnsupportedChannel { .. }));

        // 只有 PROCESSING 一次写入，没有后续状态迁移
        let updates = repo.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].status, NotificationStatus::Processing);
    }

    #[tokio::test]
    async fn test_infrastructure_failure_propagates() {
        let repo = Arc::new(RecordingRepo {
            fail_updates: true,
            ..Default::default()
        });
        let registry = Arc::new(ChannelRegistry::new(vec![Arc::new(StubChannel {
            channel_type: ChannelType::Email,
            behavior: SendBehavior::Succeed,
        })]));
        let dispatcher =
            NotificationDispatcher::new(repo, registry, Duration::from_secs(5));

        let err = dispatcher
            .dispatch(make_notification(7))
            .await
            .expect_err("持久化失败应向上传播");
        assert!(matches!(err, NotifyError::Database(_)));
    }
}
