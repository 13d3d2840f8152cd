//! `workbench-probe resources` command handler

use std::io::Write;

use serde::Serialize;
use tracing::info;

use workbench_pod_verifier::resources::AUTH_SIDECAR_CONTAINER;
use workbench_pod_verifier::{
    ExecTarget, ExpectedSidecarResources, PreconditionFailure, ResourceMismatch, VerifierError,
    check_auth_sidecar_resources,
};
use workbench_probe_core::config::ProbeConfig;

use crate::cli::ResourcesArgs;
use crate::commands::{connect_container, connect_pod};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `resources` command.
pub async fn execute(
    args: ResourcesArgs,
    config: &ProbeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let pairs = parse_annotations(&args.annotations)?;
    let expected = ExpectedSidecarResources::from_annotations(
        pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    )?;

    let mismatches = if args.target.docker {
        let target = connect_container(&args.target)?;
        run(&target, &expected).await?
    } else {
        let target = connect_pod(&args.target, config).await?;
        run(&target, &expected).await?
    };

    let report = ResourcesReport::new(args.target.pod, expected.len(), &mismatches);
    writer.render(&report)?;

    if !report.matches {
        return Err(CliError::Verification(format!(
            "{} of {} sidecar resource values differ",
            report.mismatches.len(),
            report.checked
        )));
    }
    Ok(())
}

/// Split `key=value` arguments.
fn parse_annotations(raw: &[String]) -> Result<Vec<(String, String)>, CliError> {
    raw.iter()
        .map(|entry| {
            entry
                .split_once('=')
                .filter(|(key, value)| !key.trim().is_empty() && !value.trim().is_empty())
                .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
                .ok_or_else(|| {
                    CliError::Precondition(format!(
                        "invalid annotation '{entry}', expected KEY=VALUE"
                    ))
                })
        })
        .collect()
}

async fn run<T: ExecTarget>(
    target: &T,
    expected: &ExpectedSidecarResources,
) -> Result<Vec<ResourceMismatch>, CliError> {
    let snapshot = target
        .snapshot()
        .await?
        .ok_or_else(|| {
            VerifierError::Precondition(PreconditionFailure::TargetMissing {
                target: target.name().to_owned(),
            })
        })?;

    info!(
        target_name = target.name(),
        fields = expected.len(),
        "checking auth sidecar resources"
    );
    Ok(check_auth_sidecar_resources(&snapshot, expected)?)
}

/// One differing resource value.
#[derive(Debug, Serialize)]
pub struct MismatchEntry {
    pub field: String,
    pub expected: String,
    pub actual: Option<String>,
}

/// Auth sidecar resource check output.
#[derive(Debug, Serialize)]
pub struct ResourcesReport {
    /// Pod name
    pub target: String,
    /// Sidecar container name
    pub container: String,
    /// Number of annotated values compared
    pub checked: usize,
    pub matches: bool,
    pub mismatches: Vec<MismatchEntry>,
}

impl ResourcesReport {
    pub fn new(target: String, checked: usize, mismatches: &[ResourceMismatch]) -> Self {
        Self {
            target,
            container: AUTH_SIDECAR_CONTAINER.to_owned(),
            checked,
            matches: mismatches.is_empty(),
            mismatches: mismatches
                .iter()
                .map(|m| MismatchEntry {
                    field: m.field.to_string(),
                    expected: m.expected.clone(),
                    actual: m.actual.clone(),
                })
                .collect(),
        }
    }
}

impl Render for ResourcesReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Auth sidecar resources in {} (container: {})",
            self.target.bold(),
            self.container
        )?;
        if self.matches {
            writeln!(
                w,
                "  Result: {} ({} values checked)",
                "MATCH".green().bold(),
                self.checked
            )?;
        } else {
            writeln!(w, "  Result: {}", "MISMATCH".red().bold())?;
            for m in &self.mismatches {
                writeln!(
                    w,
                    "  Expected {} '{}', got '{}'",
                    m.field,
                    m.expected,
                    m.actual.as_deref().unwrap_or("<unset>")
                )?;
            }
        }
        Ok(())
    }
}
