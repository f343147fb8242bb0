use checkin_fnnas::{init_log_env, notify, Checkin, Config, FnClient, Notifier, TITLE_CONFIG_ERROR};
use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_log_env()?;

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            notify::LogNotifier
                .notify(TITLE_CONFIG_ERROR, &e.to_string())
                .await?;
            return Ok(());
        }
    };
    let notifier = notify::from_config(&config);

    let forum = match FnClient::new(&config) {
        Ok(forum) => forum,
        Err(e) => {
            error!("{}", e);
            if let Err(e) = notifier
                .notify(TITLE_CONFIG_ERROR, &e.to_string())
                .await
            {
                error!("发送通知失败: {:#}", e);
            }
            return Ok(());
        }
    };

    Checkin::new(config, forum, notifier).run().await;
    Ok(())
}
