//! `relaybot config`: print the effective configuration.

use std::path::Path;

use relaybot_infra::config::load_bot_config;

pub async fn show_config(data_dir: &Path, json: bool) -> anyhow::Result<()> {
    let config = load_bot_config(data_dir).await;

    if json {
        let out = serde_json::json!({
            "data_dir": data_dir.display().to_string(),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("  Data directory: {}", data_dir.display());
        println!();
        println!("{}", serde_json::to_string_pretty(&config)?);
    }
    Ok(())
}
