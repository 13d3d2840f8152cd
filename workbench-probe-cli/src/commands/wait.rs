//! `workbench-probe wait` command handler

use std::io::Write;

use serde::Serialize;

use workbench_pod_verifier::{ExecTarget, VerifierConfig, VerifierError, wait_until_ready};
use workbench_probe_core::config::ProbeConfig;
use workbench_probe_core::types::TargetSnapshot;

use crate::cli::WaitArgs;
use crate::commands::{connect_container, connect_pod};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `wait` command.
///
/// A readiness failure still renders its diagnostics before exiting with code 6.
pub async fn execute(
    args: WaitArgs,
    config: &ProbeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut verifier_config = VerifierConfig::from_core(config);
    if let Some(timeout) = args.timeout {
        verifier_config.readiness_timeout_secs = timeout;
    }
    verifier_config.validate()?;

    let report = if args.target.docker {
        let target = connect_container(&args.target)?;
        run(&target, &verifier_config).await?
    } else {
        let target = connect_pod(&args.target, config).await?;
        run(&target, &verifier_config).await?
    };

    writer.render(&report)?;

    if !report.ready {
        return Err(CliError::Timeout(format!(
            "'{}' did not become ready within {}s",
            report.target, verifier_config.readiness_timeout_secs
        )));
    }
    Ok(())
}

async fn run<T: ExecTarget>(target: &T, config: &VerifierConfig) -> Result<WaitReport, CliError> {
    match wait_until_ready(target, config).await {
        Ok(snapshot) => Ok(WaitReport::ready(&snapshot)),
        Err(VerifierError::NotReady(failure)) => Ok(WaitReport {
            target: failure.target.clone(),
            ready: false,
            phase: failure.phase.as_ref().map(ToString::to_string),
            containers: Vec::new(),
            failure: Some(failure.to_string()),
        }),
        Err(e) => Err(e.into()),
    }
}

/// Per-container readiness.
#[derive(Debug, Serialize)]
pub struct ContainerReadiness {
    pub name: String,
    pub ready: bool,
}

/// Readiness wait output.
#[derive(Debug, Serialize)]
pub struct WaitReport {
    /// Pod (or Docker container) name
    pub target: String,
    /// Whether the Ready condition was reached
    pub ready: bool,
    /// Last observed phase, `None` when the target was never created
    pub phase: Option<String>,
    pub containers: Vec<ContainerReadiness>,
    /// Diagnostics when the wait failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl WaitReport {
    fn ready(snapshot: &TargetSnapshot) -> Self {
        Self {
            target: snapshot.name.clone(),
            ready: true,
            phase: Some(snapshot.phase.to_string()),
            containers: snapshot
                .container_statuses
                .iter()
                .map(|status| ContainerReadiness {
                    name: status.name.clone(),
                    ready: status.ready,
                })
                .collect(),
            failure: None,
        }
    }
}

impl Render for WaitReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if self.ready {
            writeln!(w, "{} {} is Ready", "✓".green(), self.target.bold())?;
            if let Some(ref phase) = self.phase {
                writeln!(w, "  Phase: {phase}")?;
            }
            for container in &self.containers {
                writeln!(w, "  - {}: ready={}", container.name, container.ready)?;
            }
        } else {
            writeln!(w, "{} {} is not Ready", "✗".red(), self.target.bold())?;
            if let Some(ref failure) = self.failure {
                writeln!(w)?;
                writeln!(w, "{failure}")?;
            }
        }
        Ok(())
    }
}
