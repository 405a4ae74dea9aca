use anyhow::Context;
use dining_core::{BackgroundTasks, Config, DiningState, init_logger_with_file};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境变量 (.env 可选)
    dotenv::dotenv().ok();
    let config = Config::from_env();

    // 2. 日志
    init_logger_with_file(Some(config.log_level.as_str()), config.log_dir.as_deref());
    tracing::info!(
        environment = %config.environment,
        work_dir = %config.work_dir,
        "Dining core starting..."
    );

    // 3. 存储
    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("failed to create work dir {}", config.work_dir))?;
    let state = DiningState::open(config).context("failed to open database")?;

    // 4. 后台清扫
    let mut tasks = BackgroundTasks::new();
    state.start_background_tasks(&mut tasks);

    // 5. 等待退出信号
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received");

    tasks.shutdown().await;
    Ok(())
}
