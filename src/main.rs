use anyhow::Result;
use mcq_quiz::utils::logging;
use mcq_quiz::{App, Config};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置（缺少 API key 时直接退出）
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
