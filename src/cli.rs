use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "kubelab",
    version,
    about = "A Kubernetes practice lab with simulated clusters and a canned kubectl shell."
)]
pub struct CliArgs {
    /// Open the terminal of this cluster (name or id) right away
    #[arg(short, long)]
    pub cluster: Option<String>,

    /// User shown in the shell prompt
    #[arg(short, long)]
    pub user: Option<String>,

    /// Track used when launching a new cluster (ckad, cka, cks)
    #[arg(long, default_value = "ckad")]
    pub track: String,

    /// Size used when launching a new cluster (single, multi)
    #[arg(long, default_value = "multi")]
    pub size: String,

    /// Lower bound of the simulated command latency in milliseconds
    #[arg(long)]
    pub min_latency_ms: Option<u64>,

    /// Upper bound of the simulated command latency in milliseconds
    #[arg(long)]
    pub max_latency_ms: Option<u64>,

    /// UI tick interval in milliseconds
    #[arg(long, default_value_t = 250)]
    pub tick_ms: u64,

    /// Path to a YAML config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Write logs to this file instead of discarding them
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn defaults_parse_without_arguments() {
        let args = CliArgs::try_parse_from(["kubelab"]).expect("default args");
        assert_eq!(args.track, "ckad");
        assert_eq!(args.size, "multi");
        assert_eq!(args.tick_ms, 250);
        assert!(args.cluster.is_none());
        assert_eq!(args.log_filter, "info");
    }

    #[test]
    fn latency_and_cluster_flags_parse() {
        let args = CliArgs::try_parse_from([
            "kubelab",
            "-c",
            "ckad-practice-01",
            "--min-latency-ms",
            "10",
            "--max-latency-ms",
            "20",
        ])
        .expect("args");
        assert_eq!(args.cluster.as_deref(), Some("ckad-practice-01"));
        assert_eq!(args.min_latency_ms, Some(10));
        assert_eq!(args.max_latency_ms, Some(20));
    }
}
