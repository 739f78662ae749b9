//! `agent-brain status`: proxy `/health/status`.

use crate::client::ApiClient;
use crate::error::CliResult;

pub async fn run(client: &ApiClient, json: bool) -> CliResult<()> {
    let status: serde_json::Value = client.get("/health/status").await?;
    if json {
        println!("{status}");
    } else {
        println!("status: {}", status["status"].as_str().unwrap_or("unknown"));
        println!("uptime: {}s", status["uptime_seconds"]);
        println!("total chunks: {}", status["total_chunks"]);
        println!("indexed folders: {}", status["indexed_folders"]);
        println!(
            "queue: pending={} running={} completed={} failed={}",
            status["queue"]["pending"], status["queue"]["running"], status["queue"]["completed"], status["queue"]["failed"]
        );
    }
    Ok(())
}
