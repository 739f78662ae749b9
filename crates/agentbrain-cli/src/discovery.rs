//! Server discovery: resolving which running `agent-brain` server a CLI
//! invocation should talk to, and scanning for per-project runtime
//! descriptors written by the server on bind.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Mirrors `agentbrain_api::lifecycle::RuntimeDescriptor` without depending
/// on the server binary's crate; the two must stay field-compatible since
/// they share the same `runtime.json` wire format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeDescriptor {
    pub mode: String,
    pub project_root: PathBuf,
    pub bind_host: String,
    pub port: u16,
    pub pid: u32,
    pub base_url: String,
}

fn runtime_path(project_root: &Path) -> PathBuf {
    project_root
        .join(".claude")
        .join("agent-brain")
        .join("runtime.json")
}

/// Read the runtime descriptor for `project_root`, if a server has bound one.
pub fn read_runtime_descriptor(project_root: &Path) -> Option<RuntimeDescriptor> {
    let contents = std::fs::read_to_string(runtime_path(project_root)).ok()?;
    serde_json::from_str(&contents).ok()
}

/// Walk upward from `start_dir` looking for a live runtime descriptor,
/// mirroring the ancestor config search in `agentbrain_config::source`.
pub fn find_ancestor_descriptor(start_dir: &Path) -> Option<RuntimeDescriptor> {
    let mut dir = Some(start_dir);
    while let Some(current) = dir {
        if let Some(descriptor) = read_runtime_descriptor(current) {
            return Some(descriptor);
        }
        dir = current.parent();
    }
    None
}

/// Resolve the base URL to talk to, in documented precedence order:
/// explicit `--url`, `$AGENT_BRAIN_URL`, the nearest project's runtime
/// descriptor, the resolved config file's `server.url`, then the default.
pub fn resolve_base_url(explicit: Option<&str>, start_dir: &Path) -> CliResult<String> {
    if let Some(url) = explicit {
        return Ok(url.trim_end_matches('/').to_string());
    }
    if let Ok(url) = std::env::var("AGENT_BRAIN_URL") {
        return Ok(url.trim_end_matches('/').to_string());
    }
    if let Some(descriptor) = find_ancestor_descriptor(start_dir) {
        return Ok(descriptor.base_url.trim_end_matches('/').to_string());
    }
    if let Some(config_path) = agentbrain_config::source::resolve_config_path(start_dir) {
        let config: PartialServerConfig = agentbrain_config::source::load_yaml_file(&config_path)?;
        if let Some(url) = config.server.and_then(|s| s.url) {
            return Ok(url.trim_end_matches('/').to_string());
        }
    }
    Ok(DEFAULT_BASE_URL.to_string())
}

/// The slice of the config file this crate cares about for discovery;
/// loaded with `serde`'s default-everything-optional behavior so an
/// unrelated or partial config file never fails discovery.
#[derive(Debug, Default, Deserialize)]
struct PartialServerConfig {
    server: Option<PartialServer>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialServer {
    url: Option<String>,
}

/// List every project this machine knows about by scanning common roots
/// for `.claude/agent-brain/runtime.json`, used by `agent-brain list`.
pub fn scan_known_projects(search_roots: &[PathBuf]) -> Vec<RuntimeDescriptor> {
    let mut found = Vec::new();
    for root in search_roots {
        if let Some(descriptor) = read_runtime_descriptor(root) {
            found.push(descriptor);
        }
    }
    found
}

/// Default places to look for known projects: the current directory and,
/// if present, the project roots recorded under `$HOME/.agent-brain/known`.
pub fn default_search_roots(cwd: &Path) -> CliResult<Vec<PathBuf>> {
    let mut roots = vec![cwd.to_path_buf()];
    if let Some(home) = dirs::home_dir() {
        let registry = home.join(".agent-brain").join("known_projects");
        if let Ok(contents) = std::fs::read_to_string(&registry) {
            roots.extend(contents.lines().filter(|l| !l.trim().is_empty()).map(PathBuf::from));
        }
    }
    Ok(roots)
}

/// Record `project_root` in the known-projects registry so `list` can find
/// it later even from a different working directory.
pub fn remember_project(project_root: &Path) -> CliResult<()> {
    let home = dirs::home_dir().ok_or_else(|| CliError::Other(anyhow::anyhow!("no home directory")))?;
    let dir = home.join(".agent-brain");
    std::fs::create_dir_all(&dir)?;
    let registry = dir.join("known_projects");
    let existing = std::fs::read_to_string(&registry).unwrap_or_default();
    let already_known = existing.lines().any(|l| Path::new(l) == project_root);
    if !already_known {
        use std::io::Write as _;
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&registry)?;
        writeln!(file, "{}", project_root.display())?;
    }
    Ok(())
}
