use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use user_service::{
    AppState,
    config::Config,
    database::{self, PgUserStore},
    router,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().inspect_err(|e| {
        tracing::error!("Failed to load configuration: {}", e);
    })?;

    // 设置数据库连接池并执行迁移
    let pool = database::connect(&config).await.inspect_err(|e| {
        tracing::error!("Failed to connect to Postgres: {}", e);
    })?;

    // 设置应用状态
    let state = AppState::new(Arc::new(PgUserStore::new(pool)), config);
    let settings = state.limiter.settings();
    tracing::info!(
        "Rate limit: {} requests per {:?}, sweep every {:?}",
        settings.max_requests,
        settings.window,
        settings.sweep_interval
    );

    // 限流计数的后台清理任务，整个进程只有一个
    let sweeper = state.limiter.spawn_sweeper();

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    // 启动服务器
    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    let grace = state.config.shutdown_grace();
    let app = router::app(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // 只监听一次停止信号，再分发给服务器和超时计时
    let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    let mut server_stop = stop_rx.clone();
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        let _ = server_stop.wait_for(|stop| *stop).await;
    });

    // 收到停止信号后，未完成的请求最多再等待 grace
    tokio::select! {
        result = server.into_future() => result?,
        _ = async {
            let _ = stop_rx.wait_for(|stop| *stop).await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!("Graceful shutdown timed out after {:?}", grace);
        }
    }

    sweeper.shutdown().await;
    tracing::info!("Server exited properly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
