use axum::Router;
use lungcare_backend::{AppConfig, ShutdownManager, ShutdownReason, app, startup};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

async fn bind(service: &str, addr: &str) -> TcpListener {
    TcpListener::bind(addr).await.unwrap_or_else(|e| {
        tracing::error!("Bind address failed {} ({}): {}", addr, service, e);
        std::process::exit(1);
    })
}

async fn serve(
    service: &'static str,
    listener: TcpListener,
    app: Router,
    shutdown: ShutdownManager,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let reason = shutdown.wait().await;
            tracing::info!(service, "接收到退出信号: {:?}，开始优雅关闭HTTP服务器...", reason);
        })
        .await
}

#[tokio::main]
async fn main() {
    // 配置先于日志加载：日志级别来自配置
    if let Err(e) = AppConfig::init_global() {
        eprintln!("Config init failed: {e}");
        std::process::exit(1);
    }
    let config = AppConfig::global();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("lungcare_backend={},tower_http=info", config.logging.level).into()
            }),
        )
        .init();

    if !config.risk.enabled && !config.triage.enabled {
        tracing::error!("risk 与 triage 服务均未启用，退出");
        std::process::exit(1);
    }

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_listener();

    let mut servers = JoinSet::new();

    if config.risk.enabled {
        let permits = Arc::new(Semaphore::new(config.inference.permits()));
        let state = startup::build_risk_state(config, permits);
        let app = app::build_risk_app(state, &config.cors);
        let addr = config.risk.addr();
        let listener = bind("risk", &addr).await;

        tracing::info!("Risk server: http://{}", addr);
        tracing::info!("Risk predict: http://{}/predict", addr);
        tracing::info!("Risk docs: http://{}/docs", addr);
        servers.spawn(serve("risk", listener, app, shutdown.clone()));
    }

    if config.triage.enabled {
        let permits = Arc::new(Semaphore::new(config.inference.permits()));
        let state = match startup::build_triage_state(config, permits).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Triage startup failed: {}", e);
                std::process::exit(1);
            }
        };
        let app = app::build_triage_app(state, &config.cors);
        let addr = config.triage.addr();
        let listener = bind("triage", &addr).await;

        tracing::info!("Triage server: http://{}", addr);
        tracing::info!("Triage upload: http://{}/upload", addr);
        tracing::info!("Triage docs: http://{}/docs", addr);
        servers.spawn(serve("triage", listener, app, shutdown.clone()));
    }

    let drain = async {
        while let Some(joined) = servers.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!("服务器运行错误: {}", e);
                    shutdown.trigger(ShutdownReason::Application);
                }
                Err(e) => {
                    tracing::error!("服务器任务异常退出: {}", e);
                    shutdown.trigger(ShutdownReason::Application);
                }
            }
        }
    };

    let timeout = config.shutdown.timeout_duration();
    let deadline = async {
        shutdown.wait().await;
        tracing::info!("优雅退出超时时间: {}秒", config.shutdown.timeout_secs);
        tokio::time::sleep(timeout).await;
    };

    tokio::select! {
        _ = drain => tracing::info!("服务器已优雅关闭"),
        _ = deadline => {
            tracing::warn!("优雅退出超时，强制退出");
            std::process::exit(1);
        }
    }
}
