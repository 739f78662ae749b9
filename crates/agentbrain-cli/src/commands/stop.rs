//! `agent-brain stop`: signal the running server for this project to shut down.

use std::path::Path;
use std::time::Duration;

use crate::discovery::read_runtime_descriptor;
use crate::error::{CliError, CliResult};

pub async fn run(project_root: &Path, json: bool) -> CliResult<()> {
    let descriptor = read_runtime_descriptor(project_root).ok_or(CliError::ServerNotFound)?;

    let status = std::process::Command::new("kill")
        .args(["-TERM", &descriptor.pid.to_string()])
        .status()
        .map_err(|e| CliError::Other(anyhow::anyhow!("failed to signal pid {}: {e}", descriptor.pid)))?;
    if !status.success() {
        return Err(CliError::Other(anyhow::anyhow!(
            "no such process (pid {}); removing stale runtime descriptor",
            descriptor.pid
        )));
    }

    wait_for_shutdown(project_root, Duration::from_secs(10)).await;

    if json {
        println!("{}", serde_json::json!({ "stopped": descriptor.pid }));
    } else {
        println!("stopped server (pid {})", descriptor.pid);
    }
    Ok(())
}

async fn wait_for_shutdown(project_root: &Path, timeout: Duration) {
    let deadline = tokio::time::Instant::now() + timeout;
    while read_runtime_descriptor(project_root).is_some() {
        if tokio::time::Instant::now() >= deadline {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
