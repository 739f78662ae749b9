//! `agent-brain init`: scaffold a project's state directory and config.

use std::path::Path;

use agentbrain_config::AppConfig;

use crate::discovery::remember_project;
use crate::error::{CliError, CliResult};

pub async fn run(project_root: &Path, json: bool) -> CliResult<()> {
    let state_dir = project_root.join(".claude").join("agent-brain");
    std::fs::create_dir_all(&state_dir)?;
    std::fs::create_dir_all(state_dir.join("data"))?;
    std::fs::create_dir_all(state_dir.join("jobs"))?;
    std::fs::create_dir_all(state_dir.join("logs"))?;

    let config_path = state_dir.join("config.yaml");
    if !config_path.exists() {
        let config = AppConfig::default();
        let yaml = serde_yaml::to_string(&config)
            .map_err(|e| CliError::Other(anyhow::anyhow!("serialize default config: {e}")))?;
        std::fs::write(&config_path, yaml)?;
    }

    remember_project(project_root)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "project_root": project_root, "state_dir": state_dir, "config": config_path })
        );
    } else {
        println!("initialized agent-brain project at {}", project_root.display());
        println!("config: {}", config_path.display());
    }
    Ok(())
}
