//! 信号处理模块
//!
//! 把 SIGINT/SIGTERM 转换为关闭广播，驱动调度器和 Web 服务器优雅退出

use crate::error::Result;
use tokio::sync::broadcast;
use tracing::{error, info, warn};

#[cfg(unix)]
use signal_hook::consts::{SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook_tokio::Signals;

/// 设置信号处理器
pub async fn setup_signal_handlers(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
    #[cfg(unix)]
    {
        setup_unix_signals(shutdown_tx).await
    }
    #[cfg(not(unix))]
    {
        setup_ctrl_c(shutdown_tx);
        Ok(())
    }
}

/// Unix/Linux系统信号处理
#[cfg(unix)]
async fn setup_unix_signals(shutdown_tx: broadcast::Sender<()>) -> Result<()> {
    use futures::stream::StreamExt;

    let mut signals = Signals::new([SIGINT, SIGTERM])?;
    let handle = signals.handle();

    tokio::spawn(async move {
        if let Some(signal) = signals.next().await {
            match signal {
                SIGINT => info!("接收到 SIGINT 信号，开始优雅关闭..."),
                SIGTERM => info!("接收到 SIGTERM 信号，开始优雅关闭..."),
                _ => warn!("接收到未处理的信号: {signal}"),
            }
            if let Err(e) = shutdown_tx.send(()) {
                error!("发送关闭信号失败: {e}");
            }
        }
        handle.close();
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_ctrl_c(shutdown_tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("接收到 Ctrl+C，开始优雅关闭...");
                if let Err(e) = shutdown_tx.send(()) {
                    error!("发送关闭信号失败: {e}");
                }
            }
            Err(e) => error!("监听 Ctrl+C 失败: {e}"),
        }
    });
}
