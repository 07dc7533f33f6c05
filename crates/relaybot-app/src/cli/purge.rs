//! `relaybot purge`: one-off deletion of old chat history.

use chrono::{TimeDelta, Utc};
use relaybot_core::chat::repository::ChatRecordRepository;

use crate::state::AppState;

pub async fn purge(state: &AppState, older_than_hours: u32, json: bool) -> anyhow::Result<()> {
    let cutoff = Utc::now() - TimeDelta::hours(i64::from(older_than_hours));
    let deleted = state.records.delete_before(cutoff).await?;
    let remaining = state.records.count().await?;
    tracing::info!(deleted, remaining, cutoff = %cutoff, "Purged chat history");

    if json {
        let out = serde_json::json!({
            "deleted": deleted,
            "remaining": remaining,
            "cutoff": cutoff.to_rfc3339(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("  Deleted {deleted} chat record(s) older than {older_than_hours}h.");
        println!("  {remaining} record(s) remain.");
    }
    Ok(())
}
