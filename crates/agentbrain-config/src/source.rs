//! Configuration file discovery and environment-variable overrides.
//!
//! Resolution order for the YAML config file, first path that exists wins:
//! `$AGENT_BRAIN_CONFIG`, `./agent-brain.yaml`, the nearest ancestor's
//! `.claude/agent-brain/config.yaml`, `$HOME/.agent-brain/config.yaml`,
//! `$HOME/.config/agent-brain/config.yaml`.

use std::path::{Path, PathBuf};

/// Find the first existing configuration file along the documented search order.
///
/// `start_dir` is the directory to begin the ancestor search from (typically
/// the current working directory or the project root being operated on).
pub fn resolve_config_path(start_dir: &Path) -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var("AGENT_BRAIN_CONFIG") {
        let path = PathBuf::from(explicit);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_candidate = start_dir.join("agent-brain.yaml");
    if cwd_candidate.exists() {
        return Some(cwd_candidate);
    }

    if let Some(ancestor_config) = find_ancestor_config(start_dir) {
        return Some(ancestor_config);
    }

    if let Some(home) = dirs::home_dir() {
        let legacy = home.join(".agent-brain").join("config.yaml");
        if legacy.exists() {
            return Some(legacy);
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let xdg = config_dir.join("agent-brain").join("config.yaml");
        if xdg.exists() {
            return Some(xdg);
        }
    }

    None
}

/// Walk upward from `start_dir` looking for `.claude/agent-brain/config.yaml`.
fn find_ancestor_config(start_dir: &Path) -> Option<PathBuf> {
    let mut dir = Some(start_dir);
    while let Some(current) = dir {
        let candidate = current.join(".claude").join("agent-brain").join("config.yaml");
        if candidate.exists() {
            return Some(candidate);
        }
        dir = current.parent();
    }
    None
}

/// Read and parse the YAML config file at `path`, if it exists.
///
/// # Errors
/// Returns [`crate::ConfigError::Io`] if the file cannot be read, or
/// [`crate::ConfigError::YamlParsing`] if its contents are not valid YAML.
pub fn load_yaml_file<T: serde::de::DeserializeOwned>(path: &Path) -> crate::ConfigResult<T> {
    let contents = std::fs::read_to_string(path)?;
    let parsed = serde_yaml::from_str(&contents)?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn resolves_cwd_file_over_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("agent-brain.yaml"), "server:\n  port: 9000\n")
            .expect("write config");
        let resolved = resolve_config_path(dir.path());
        assert_eq!(resolved, Some(dir.path().join("agent-brain.yaml")));
    }

    #[test]
    fn resolves_ancestor_state_dir_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).expect("mkdir");
        let state_dir = dir.path().join(".claude").join("agent-brain");
        fs::create_dir_all(&state_dir).expect("mkdir state");
        fs::write(state_dir.join("config.yaml"), "project:\n  state_dir: /tmp\n")
            .expect("write config");

        let resolved = resolve_config_path(&nested);
        assert_eq!(resolved, Some(state_dir.join("config.yaml")));
    }

    #[test]
    fn explicit_env_var_wins_over_cwd_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("agent-brain.yaml"), "server:\n  port: 9000\n")
            .expect("write cwd config");
        let explicit = dir.path().join("explicit.yaml");
        fs::write(&explicit, "server:\n  port: 9100\n").expect("write explicit config");

        // SAFETY: test-only env var scoped to this process and restored immediately after.
        unsafe {
            std::env::set_var("AGENT_BRAIN_CONFIG", &explicit);
        }
        let resolved = resolve_config_path(dir.path());
        unsafe {
            std::env::remove_var("AGENT_BRAIN_CONFIG");
        }
        assert_eq!(resolved, Some(explicit));
    }
}
