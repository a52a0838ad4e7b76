//! Web服务器实现
//!
//! 提供HTTP服务器和路由管理

use super::{handlers, AppState};
use crate::error::Result;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::info;

/// 构建路由
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/add", post(handlers::add_url))
        .route("/delete", post(handlers::delete_url))
        .route("/api/urls", get(handlers::api_urls))
        .route("/healthz", get(handlers::healthz))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Web服务器
pub struct WebServer {
    /// 共享状态
    state: AppState,
    /// 关闭信号接收器
    shutdown_rx: broadcast::Receiver<()>,
}

impl WebServer {
    /// 创建新的Web服务器
    pub fn new(state: AppState, shutdown_rx: broadcast::Receiver<()>) -> Self {
        Self { state, shutdown_rx }
    }

    /// 绑定监听地址并运行，直到收到关闭信号
    pub async fn run(self) -> Result<()> {
        let addrs = self.state.config.listen_addrs()?;
        let listener = TcpListener::bind(addrs.as_slice()).await?;
        self.serve(listener).await
    }

    /// 在已绑定的监听器上运行
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        let mut shutdown_rx = self.shutdown_rx;
        let addr = listener.local_addr()?;
        info!("Web服务器已启动: http://{}", addr);

        axum::serve(listener, router(self.state))
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("接收到关闭信号，正在关闭Web服务器...");
            })
            .await?;

        info!("Web服务器已关闭");
        Ok(())
    }
}
