//! `agent-brain start`: spawn the server binary detached for this project.

use std::path::Path;
use std::time::Duration;

use crate::discovery::{read_runtime_descriptor, remember_project};
use crate::error::{CliError, CliResult};

pub async fn run(project_root: &Path, json: bool) -> CliResult<()> {
    if let Some(existing) = read_runtime_descriptor(project_root) {
        if process_alive(existing.pid) {
            if json {
                println!("{}", serde_json::to_string(&existing).unwrap());
            } else {
                println!("already running at {} (pid {})", existing.base_url, existing.pid);
            }
            return Ok(());
        }
    }

    let exe = server_binary_path()?;
    let child = std::process::Command::new(exe)
        .arg(project_root)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .spawn()
        .map_err(|e| CliError::Other(anyhow::anyhow!("failed to spawn server: {e}")))?;

    remember_project(project_root)?;

    let descriptor = wait_for_descriptor(project_root, Duration::from_secs(10)).await?;
    if json {
        println!("{}", serde_json::to_string(&descriptor).unwrap());
    } else {
        println!("started server (pid {}) at {}", child.id(), descriptor.base_url);
    }
    Ok(())
}

async fn wait_for_descriptor(project_root: &Path, timeout: Duration) -> CliResult<crate::discovery::RuntimeDescriptor> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if let Some(descriptor) = read_runtime_descriptor(project_root) {
            return Ok(descriptor);
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(CliError::Other(anyhow::anyhow!(
                "server did not report its runtime descriptor within {}s",
                timeout.as_secs()
            )));
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

fn server_binary_path() -> CliResult<std::path::PathBuf> {
    let exe = std::env::current_exe()?;
    let dir = exe.parent().ok_or_else(|| CliError::Other(anyhow::anyhow!("cannot locate sibling binaries")))?;
    let candidate = dir.join("agentbrain-api");
    if candidate.exists() {
        return Ok(candidate);
    }
    // Fall back to $PATH for installed deployments.
    Ok(std::path::PathBuf::from("agentbrain-api"))
}

fn process_alive(pid: u32) -> bool {
    // `kill -0` sends no signal but still fails if the pid doesn't exist or
    // isn't ours; shelling out avoids pulling in an FFI binding for one check.
    std::process::Command::new("kill")
        .args(["-0", &pid.to_string()])
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
