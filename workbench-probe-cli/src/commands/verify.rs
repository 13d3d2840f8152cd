//! `workbench-probe verify` command handler

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, info_span};

use workbench_pod_verifier::{
    ExecTarget, PackageVerifier, VerificationReport, VerifierConfig,
    format_package_failure_report, summary_line, validate_request,
};
use workbench_probe_core::config::ProbeConfig;

use crate::cli::VerifyArgs;
use crate::commands::{connect_container, connect_pod};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `verify` command.
///
/// Exits with code 5 when at least one package fails to import.
pub async fn execute(
    args: VerifyArgs,
    config: &ProbeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let verifier_config = verifier_config(&args, config);
    verifier_config.validate()?;

    let timeout = Duration::from_secs(
        args.timeout
            .unwrap_or(verifier_config.package_timeout_secs),
    );
    validate_request(&args.packages, timeout)?;
    let container = args
        .container
        .clone()
        .unwrap_or_else(|| args.target.pod.clone());

    let results = if args.target.docker {
        let target = Arc::new(connect_container(&args.target)?);
        run(target, verifier_config, &container, &args.packages, timeout).await?
    } else {
        let target = Arc::new(connect_pod(&args.target, config).await?);
        run(target, verifier_config, &container, &args.packages, timeout).await?
    };

    let report = VerifyReport::new(args.target.pod, container, results);
    writer.render(&report)?;

    if !report.results.all_successful() {
        return Err(CliError::Verification(report.summary));
    }
    Ok(())
}

/// Apply command line overrides on top of the configured verifier settings.
fn verifier_config(args: &VerifyArgs, config: &ProbeConfig) -> VerifierConfig {
    let mut verifier_config = VerifierConfig::from_core(config);
    if let Some(runtime) = &args.runtime {
        verifier_config.runtime = runtime.clone();
    }
    if args.no_diagnostics {
        verifier_config.collect_diagnostics = false;
    }
    verifier_config
}

async fn run<T: ExecTarget>(
    target: Arc<T>,
    config: VerifierConfig,
    container: &str,
    packages: &[String],
    timeout: Duration,
) -> Result<VerificationReport, CliError> {
    let span = info_span!("verify", target_name = target.name(), container);
    let verifier = PackageVerifier::new(target, config).with_span(span);
    let results = verifier
        .verify_package_import(container, packages, timeout)
        .await?;
    info!(summary = %summary_line(&results), "verification finished");
    Ok(results)
}

/// Package verification output.
#[derive(Debug, Serialize)]
pub struct VerifyReport {
    /// Pod (or Docker container) name
    pub target: String,
    /// Container the imports ran in
    pub container: String,
    /// `<ok>/<total> packages imported successfully`
    pub summary: String,
    /// Per-package results in request order
    pub results: VerificationReport,
    /// Human readable failure report, text output only
    #[serde(skip)]
    pub failure_report: Option<String>,
}

impl VerifyReport {
    pub fn new(target: String, container: String, results: VerificationReport) -> Self {
        let failure_report = (!results.all_successful())
            .then(|| format_package_failure_report(&target, &results));
        Self {
            summary: summary_line(&results),
            target,
            container,
            results,
            failure_report,
        }
    }
}

impl Render for VerifyReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Package imports in {} (container: {})",
            self.target.bold(),
            self.container
        )?;
        for (name, result) in self.results.iter() {
            if result.import_successful {
                writeln!(
                    w,
                    "  {} {} ({:.2}s)",
                    "✓".green(),
                    name,
                    result.execution_time_seconds
                )?;
            } else {
                writeln!(w, "  {} {}", "✗".red(), name.red())?;
            }
        }
        writeln!(w)?;
        writeln!(w, "{}", self.summary.bold())?;

        if let Some(ref failure_report) = self.failure_report {
            writeln!(w)?;
            write!(w, "{failure_report}")?;
        }
        Ok(())
    }
}
