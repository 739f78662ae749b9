//! `agent-brain list`: enumerate known projects and whether each server is live.

use crate::client::ApiClient;
use crate::discovery::default_search_roots;
use crate::error::CliResult;

pub async fn run(json: bool) -> CliResult<()> {
    let cwd = std::env::current_dir()?;
    let roots = default_search_roots(&cwd)?;
    let descriptors = crate::discovery::scan_known_projects(&roots);

    let mut rows = Vec::new();
    for descriptor in &descriptors {
        let client = ApiClient::new(descriptor.base_url.clone());
        let alive = client.is_reachable().await;
        rows.push(serde_json::json!({
            "project_root": descriptor.project_root,
            "base_url": descriptor.base_url,
            "pid": descriptor.pid,
            "alive": alive,
        }));
    }

    if json {
        println!("{}", serde_json::Value::Array(rows));
    } else if rows.is_empty() {
        println!("no known projects");
    } else {
        for row in &rows {
            println!(
                "{}  {}  pid={}  {}",
                row["project_root"].as_str().unwrap_or("?"),
                row["base_url"].as_str().unwrap_or("?"),
                row["pid"],
                if row["alive"].as_bool().unwrap_or(false) { "running" } else { "stopped" },
            );
        }
    }
    Ok(())
}
