use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;

use crate::plan::{ToolKind, ToolchainPaths};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
pub struct ToolCapability {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Which external tools are actually present on this host, captured once at
/// startup. Conversions whose tool is missing are refused up front instead of
/// failing mid-run.
#[derive(Debug, Clone, Default)]
pub struct CapabilityMap {
    entries: HashMap<ToolKind, ToolCapability>,
}

impl CapabilityMap {
    /// Probe every tool by spawning it with its version flag. A tool counts
    /// as available when the binary can be spawned at all; the exit status
    /// only affects whether a version string is recorded.
    pub async fn probe(tools: &ToolchainPaths) -> Self {
        let mut entries = HashMap::new();
        for tool in ToolKind::ALL {
            let capability = probe_one(tool, tool.program(tools)).await;
            if capability.available {
                tracing::info!(
                    tool = tool.name(),
                    version = capability.version.as_deref().unwrap_or("unknown"),
                    "conversion tool detected"
                );
            } else {
                tracing::warn!(tool = tool.name(), "conversion tool not found on host");
            }
            entries.insert(tool, capability);
        }
        Self { entries }
    }

    pub fn available(&self, tool: ToolKind) -> bool {
        self.entries
            .get(&tool)
            .map(|c| c.available)
            .unwrap_or(false)
    }

    pub fn missing(&self) -> Vec<&'static str> {
        ToolKind::ALL
            .into_iter()
            .filter(|tool| !self.available(*tool))
            .map(|tool| tool.name())
            .collect()
    }

    /// Snapshot keyed by tool name, used by the health endpoint.
    pub fn summary(&self) -> HashMap<&'static str, ToolCapability> {
        ToolKind::ALL
            .into_iter()
            .filter_map(|tool| self.entries.get(&tool).map(|c| (tool.name(), c.clone())))
            .collect()
    }

    #[cfg(test)]
    pub fn assume_all_available() -> Self {
        let entries = ToolKind::ALL
            .into_iter()
            .map(|tool| {
                (
                    tool,
                    ToolCapability {
                        available: true,
                        version: None,
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

async fn probe_one(tool: ToolKind, program: &str) -> ToolCapability {
    let spawned = Command::new(program)
        .arg(tool.probe_arg())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn();

    let child = match spawned {
        Ok(child) => child,
        Err(_) => {
            return ToolCapability {
                available: false,
                version: None,
            }
        }
    };

    let version = match tokio::time::timeout(PROBE_TIMEOUT, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => String::from_utf8_lossy(&output.stdout)
            .lines()
            .next()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty()),
        _ => None,
    };

    ToolCapability {
        available: true,
        version,
    }
}
