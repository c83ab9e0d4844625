//! 优雅退出管理模块
//!
//! 两个 HTTP 服务共用同一个退出信号：任一 Ctrl+C / SIGTERM 到达后同时开始排空连接。

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// 退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 用户中断信号 (Ctrl+C)
    Interrupt,
    /// 终止信号 (SIGTERM)
    Terminate,
    /// 应用请求退出
    Application,
}

/// 优雅退出管理器（可克隆，所有副本共享同一信号）
#[derive(Debug, Clone)]
pub struct ShutdownManager {
    tx: Arc<watch::Sender<Option<ShutdownReason>>>,
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// 触发退出；重复触发时保留第一次的原因
    pub fn trigger(&self, reason: ShutdownReason) {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            info!("触发优雅退出: {:?}", reason);
            *current = Some(reason);
            true
        });
    }

    pub fn is_shutting_down(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// 等待退出信号并返回原因（先触发后等待也能立即返回）
    pub async fn wait(&self) -> ShutdownReason {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(reason) => (*reason).unwrap_or(ShutdownReason::Application),
            Err(_) => ShutdownReason::Application,
        }
    }

    /// 后台监听系统信号
    pub fn spawn_signal_listener(&self) {
        let manager = self.clone();
        tokio::spawn(async move {
            let reason = wait_for_signal().await;
            manager.trigger(reason);
        });
    }
}

#[cfg(unix)]
async fn wait_for_signal() -> ShutdownReason {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!("注册 SIGTERM 处理器失败: {}，仅监听 Ctrl+C", e);
            return wait_for_ctrl_c().await;
        }
    };
    tokio::select! {
        reason = wait_for_ctrl_c() => reason,
        _ = term.recv() => ShutdownReason::Terminate,
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> ShutdownReason {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> ShutdownReason {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("监听 Ctrl+C 失败: {}", e);
        // 无法监听时永不触发，避免误退出
        std::future::pending::<()>().await;
    }
    ShutdownReason::Interrupt
}

#[cfg(test)]
mod tests {
    use super::{ShutdownManager, ShutdownReason};
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_before_wait_returns_immediately() {
        let m = ShutdownManager::new();
        m.trigger(ShutdownReason::Terminate);
        let reason = tokio::time::timeout(Duration::from_secs(1), m.wait())
            .await
            .expect("wait should not block");
        assert_eq!(reason, ShutdownReason::Terminate);
    }

    #[tokio::test]
    async fn first_reason_wins_across_clones() {
        let m = ShutdownManager::new();
        let waiter = {
            let m = m.clone();
            tokio::spawn(async move { m.wait().await })
        };
        m.clone().trigger(ShutdownReason::Application);
        m.trigger(ShutdownReason::Interrupt);
        assert!(m.is_shutting_down());
        assert_eq!(waiter.await.expect("join"), ShutdownReason::Application);
    }
}
