//! Command handlers -- one module per subcommand

pub mod check;
pub mod config;
pub mod resources;
pub mod verify;
pub mod wait;

use std::path::Path;

use tracing::{debug, info};

use workbench_pod_verifier::{DockerContainerTarget, KubePodTarget};
use workbench_probe_core::config::ProbeConfig;
use workbench_probe_core::error::{ConfigError, WorkbenchError};

use crate::cli::TargetArgs;
use crate::error::CliError;

/// Load the configuration used by the verification commands.
///
/// A missing file is not an error here: defaults plus env overrides apply.
/// Parse and validation errors are reported.
pub async fn load_config(path: &Path) -> Result<ProbeConfig, CliError> {
    match ProbeConfig::load(path).await {
        Ok(config) => Ok(config),
        Err(WorkbenchError::Config(ConfigError::FileNotFound { .. })) => {
            debug!(path = %path.display(), "config file not found, using defaults");
            let mut config = ProbeConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
        Err(e) => Err(CliError::Config(e.to_string())),
    }
}

/// Resolve the namespace: explicit flag first, then `[cluster].namespace`.
pub fn resolve_namespace<'a>(args: &'a TargetArgs, config: &'a ProbeConfig) -> &'a str {
    args.namespace
        .as_deref()
        .unwrap_or(config.cluster.namespace.as_str())
}

/// Connect to the Kubernetes pod named by `args`.
pub async fn connect_pod(args: &TargetArgs, config: &ProbeConfig) -> Result<KubePodTarget, CliError> {
    let namespace = resolve_namespace(args, config);
    let context = Some(config.cluster.context.as_str()).filter(|c| !c.is_empty());
    info!(namespace, pod = args.pod.as_str(), "connecting to cluster");
    Ok(KubePodTarget::connect(namespace, &args.pod, context).await?)
}

/// Connect to the local Docker container named by `args.pod`.
pub fn connect_container(args: &TargetArgs) -> Result<DockerContainerTarget, CliError> {
    info!(container = args.pod.as_str(), "connecting to local docker");
    Ok(DockerContainerTarget::connect_local(&args.pod)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_args(namespace: Option<&str>) -> TargetArgs {
        TargetArgs {
            namespace: namespace.map(str::to_owned),
            pod: "my-nb-0".to_owned(),
            docker: false,
        }
    }

    #[test]
    fn test_resolve_namespace_prefers_flag() {
        let config = ProbeConfig::default();
        let args = target_args(Some("ds-project"));
        assert_eq!(resolve_namespace(&args, &config), "ds-project");
    }

    #[test]
    fn test_resolve_namespace_falls_back_to_config() {
        let mut config = ProbeConfig::default();
        config.cluster.namespace = "notebooks".to_owned();
        let args = target_args(None);
        assert_eq!(resolve_namespace(&args, &config), "notebooks");
    }

    #[tokio::test]
    async fn test_load_config_missing_file_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/workbench-probe.toml"))
            .await
            .expect("missing file falls back to defaults");
        assert_eq!(config.verification.runtime, "python");
    }

    #[tokio::test]
    async fn test_load_config_malformed_file_is_config_error() {
        let dir = tempfile::TempDir::new().expect("should create temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[general\nlog_level = 1").expect("should write file");

        let err = load_config(&path).await.expect_err("malformed toml");
        assert_eq!(err.exit_code(), 2);
    }
}
