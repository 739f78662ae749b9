//! `agent-brain index <folder>`: proxy `POST /index/`.

use crate::client::ApiClient;
use crate::error::CliResult;

pub async fn run(client: &ApiClient, folder: &str, json: bool) -> CliResult<()> {
    let body = serde_json::json!({ "folder_path": folder });
    let response: serde_json::Value = client.post("/index/", &body).await?;

    if json {
        println!("{response}");
    } else if response["dedupe_hit"].as_bool().unwrap_or(false) {
        println!("already queued or indexed as job {}", response["job_id"]);
    } else {
        println!("enqueued job {} (position {})", response["job_id"], response["queue_position"]);
    }
    Ok(())
}
