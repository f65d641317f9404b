use agent_points_runner::utils::logging::init_log_file;
use agent_points_runner::{logger, App, AppError, Config};
use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logger::init(config.verbose_logging);
    init_log_file(&config.output_log_file)?;

    // Ctrl-C 触发停止信号
    let stop = CancellationToken::new();
    let trigger = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 收到 Ctrl-C，正在停止...");
            trigger.cancel();
        }
    });

    // 初始化并运行应用
    let app = match App::initialize(config).await {
        Ok(app) => app,
        Err(AppError::Discovery(e)) => {
            error!("❌ {}", e);
            error!("API 可能已变更或暂不可用，请稍后再试");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    app.run(stop).await;

    Ok(())
}
