use crate::cli::CliArgs;
use crate::gate::{DEFAULT_MAX_LATENCY, DEFAULT_MIN_LATENCY, LatencyProfile};
use crate::responses::{CLEAR_COMMAND, ResponseTable};
use crate::toast::DEFAULT_TOAST_TTL;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const DEFAULT_USER: &str = "student";

/// Everything the application needs, after merging file and CLI values.
#[derive(Debug, Clone)]
pub struct LabConfig {
    pub source: Option<String>,
    pub user: String,
    pub latency: LatencyProfile,
    pub toast_ttl: Duration,
    pub banner: bool,
    pub responses: ResponseTable,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            source: None,
            user: DEFAULT_USER.to_string(),
            latency: LatencyProfile::default(),
            toast_ttl: DEFAULT_TOAST_TTL,
            banner: true,
            responses: ResponseTable::builtin(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct LabConfigFile {
    #[serde(default)]
    user: Option<String>,
    #[serde(default, alias = "latency")]
    latency_ms: Option<LatencySpec>,
    #[serde(default, alias = "toast_ttl")]
    toast_ttl_ms: Option<u64>,
    #[serde(default)]
    banner: Option<bool>,
    #[serde(default)]
    responses: Vec<ResponseSpec>,
}

#[derive(Debug, Clone, Deserialize)]
struct LatencySpec {
    #[serde(default = "default_min_latency_ms")]
    min: u64,
    #[serde(default = "default_max_latency_ms")]
    max: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseSpec {
    #[serde(alias = "cmd")]
    command: String,
    #[serde(default)]
    output: String,
}

impl LabConfig {
    pub fn load(args: &CliArgs) -> Result<Self> {
        let path = args.config.clone().or_else(discover_config_path);
        let file = match &path {
            Some(path) => read_config_file(path)?,
            None => LabConfigFile::default(),
        };
        Ok(Self::merge(
            path.map(|path| path.display().to_string()),
            file,
            args,
        ))
    }

    fn merge(source: Option<String>, file: LabConfigFile, args: &CliArgs) -> Self {
        let file_latency = file.latency_ms.unwrap_or(LatencySpec {
            min: default_min_latency_ms(),
            max: default_max_latency_ms(),
        });
        let min = args.min_latency_ms.unwrap_or(file_latency.min);
        let max = args.max_latency_ms.unwrap_or(file_latency.max);

        let user = args
            .user
            .clone()
            .or(file.user)
            .filter(|user| !user.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_USER.to_string());

        for response in &file.responses {
            if response.output.is_empty() && response.command.trim() != CLEAR_COMMAND {
                warn!(command = %response.command, "ignoring response without output");
            }
        }
        let responses = ResponseTable::with_extras(
            file.responses
                .into_iter()
                .map(|response| (response.command, response.output)),
        );

        Self {
            source,
            user,
            latency: LatencyProfile::new(Duration::from_millis(min), Duration::from_millis(max)),
            toast_ttl: file
                .toast_ttl_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TOAST_TTL),
            banner: file.banner.unwrap_or(true),
            responses,
        }
    }
}

fn read_config_file(path: &Path) -> Result<LabConfigFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&raw).with_context(|| format!("failed to parse config {}", path.display()))
}

fn parse_config(raw: &str) -> Result<LabConfigFile> {
    if raw.trim().is_empty() {
        return Ok(LabConfigFile::default());
    }
    Ok(serde_yaml::from_str(raw)?)
}

fn default_min_latency_ms() -> u64 {
    DEFAULT_MIN_LATENCY.as_millis() as u64
}

fn default_max_latency_ms() -> u64 {
    DEFAULT_MAX_LATENCY.as_millis() as u64
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("KUBELAB_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("kubelab.yaml"),
        PathBuf::from("kubelab.yml"),
        PathBuf::from(".kubelab.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let candidate = PathBuf::from(home).join(".config/kubelab/config.yaml");
        if candidate.exists() {
            return Some(candidate);
        }
    }

    None
}
