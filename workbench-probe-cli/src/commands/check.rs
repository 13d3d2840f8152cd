//! `workbench-probe check` command handler

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::info_span;

use workbench_pod_verifier::{
    AdvisoryDeadline, ExecTarget, SnippetReport, SnippetRunner, SnippetSuite, VerifierConfig,
    wait_for_exec_connection, wait_until_ready,
};
use workbench_probe_core::config::ProbeConfig;

use crate::cli::CheckArgs;
use crate::commands::{connect_container, connect_pod};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `check` command.
///
/// Waits for the target to become Ready and for an exec connection, then
/// runs the selected snippet suite. The advisory overall deadline covers all
/// three phases and is checked after each of them.
///
/// Exits with code 6 when a phase finishes past the overall deadline and
/// code 5 when a snippet check fails.
pub async fn execute(
    args: CheckArgs,
    config: &ProbeConfig,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let suite = SnippetSuite::by_name(&args.suite)?;
    let mut verifier_config = VerifierConfig::from_core(config);
    if let Some(secs) = args.overall_timeout {
        verifier_config.overall_timeout_secs = secs;
    }
    verifier_config.validate()?;

    let container = args
        .container
        .clone()
        .unwrap_or_else(|| args.target.pod.clone());
    let mut deadline = AdvisoryDeadline::start(verifier_config.overall_timeout());

    let results = if args.target.docker {
        let target = Arc::new(connect_container(&args.target)?);
        run(target, verifier_config, &container, &suite, &mut deadline).await?
    } else {
        let target = Arc::new(connect_pod(&args.target, config).await?);
        run(target, verifier_config, &container, &suite, &mut deadline).await?
    };
    let elapsed = deadline.finish();

    let report = CheckReport::new(args.target.pod, container, args.suite, results, elapsed);
    writer.render(&report)?;

    let failed = report.results.failed();
    if !failed.is_empty() {
        return Err(CliError::Verification(format!(
            "{} of {} snippet checks failed: {}",
            failed.len(),
            report.results.len(),
            failed.join(", ")
        )));
    }
    Ok(())
}

async fn run<T: ExecTarget>(
    target: Arc<T>,
    config: VerifierConfig,
    container: &str,
    suite: &SnippetSuite,
    deadline: &mut AdvisoryDeadline,
) -> Result<SnippetReport, CliError> {
    wait_until_ready(target.as_ref(), &config).await?;
    deadline.checkpoint("readiness")?;

    wait_for_exec_connection(target.as_ref(), container, &config).await?;
    deadline.checkpoint("exec connection")?;

    let span = info_span!("check", target_name = target.name(), container);
    let runner = SnippetRunner::new(target, config).with_span(span);
    Ok(runner.run_suite(container, suite, deadline).await?)
}

/// Snippet check output.
#[derive(Debug, Serialize)]
pub struct CheckReport {
    /// Pod (or Docker container) name
    pub target: String,
    /// Container the snippets ran in
    pub container: String,
    /// Suite name as requested
    pub suite: String,
    /// Outcome per check, in execution order
    pub results: SnippetReport,
    /// Failed checks that cover the interpreter's core modules
    pub critical_failures: Vec<String>,
    pub elapsed_seconds: f64,
}

impl CheckReport {
    pub fn new(
        target: String,
        container: String,
        suite: String,
        results: SnippetReport,
        elapsed: Duration,
    ) -> Self {
        let critical_failures = results
            .critical_failures()
            .into_iter()
            .map(str::to_owned)
            .collect();
        Self {
            target,
            container,
            suite,
            results,
            critical_failures,
            elapsed_seconds: elapsed.as_secs_f64(),
        }
    }
}

impl Render for CheckReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(
            w,
            "Snippet checks [{}] in {} (container: {})",
            self.suite,
            self.target.bold(),
            self.container
        )?;
        for (name, outcome) in self.results.iter() {
            if outcome.success {
                writeln!(
                    w,
                    "  {} {} ({:.2}s)",
                    "✓".green(),
                    name,
                    outcome.elapsed_seconds
                )?;
            } else {
                writeln!(w, "  {} {}", "✗".red(), name.red())?;
                for line in outcome.output.lines() {
                    writeln!(w, "      {line}")?;
                }
            }
        }
        writeln!(w)?;
        writeln!(
            w,
            "{}/{} checks passed in {:.2}s",
            self.results.successful().len(),
            self.results.len(),
            self.elapsed_seconds
        )?;
        if !self.critical_failures.is_empty() {
            writeln!(
                w,
                "{} {}",
                "Critical modules failed:".red().bold(),
                self.critical_failures.join(", ")
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    use workbench_pod_verifier::{SnippetOutcome, VerifierError};
    use workbench_probe_core::types::{TargetCondition, TargetPhase, TargetSnapshot};

    /// Pod that appears after a number of snapshot polls and then stays Ready.
    struct DelayedPod {
        polls_until_created: AtomicU32,
        calls: Mutex<Vec<String>>,
    }

    impl DelayedPod {
        fn new(polls_until_created: u32) -> Self {
            Self {
                polls_until_created: AtomicU32::new(polls_until_created),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ExecTarget for DelayedPod {
        fn name(&self) -> &str {
            "my-nb-0"
        }

        async fn snapshot(&self) -> Result<Option<TargetSnapshot>, VerifierError> {
            self.calls.lock().unwrap().push("snapshot".to_owned());
            let remaining = self.polls_until_created.load(Ordering::SeqCst);
            if remaining > 0 {
                self.polls_until_created.store(remaining - 1, Ordering::SeqCst);
                return Ok(None);
            }
            let mut snapshot = TargetSnapshot::new("my-nb-0", TargetPhase::Running);
            snapshot.conditions.push(TargetCondition {
                kind: "Ready".to_owned(),
                status: "True".to_owned(),
            });
            Ok(Some(snapshot))
        }

        async fn execute(&self, _container: &str, argv: &[String]) -> Result<String, VerifierError> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("execute {}", argv.join(" ")));
            Ok("ok".to_owned())
        }

        async fn log(&self, _container: &str, _tail_lines: u32) -> Result<String, VerifierError> {
            Ok(String::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_for_readiness_before_exec() {
        let target = Arc::new(DelayedPod::new(2));
        let config = VerifierConfig::default();
        let mut deadline = AdvisoryDeadline::start(config.overall_timeout());

        let report = run(
            Arc::clone(&target),
            config,
            "my-nb",
            &SnippetSuite::standard(),
            &mut deadline,
        )
        .await
        .expect("check succeeds once the pod is ready");

        assert!(report.failed().is_empty());
        let calls = target.calls();
        let first_exec = calls
            .iter()
            .position(|c| c.starts_with("execute"))
            .expect("snippets executed");
        assert_eq!(calls[first_exec], "execute echo connection_test");
        assert!(calls[..first_exec].iter().all(|c| c == "snapshot"));
        // 생성 전 2회, 존재 확인 1회, Ready 확인 1회
        assert_eq!(first_exec, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_readiness_trips_overall_deadline() {
        // 5초 간격으로 4번 조회한 뒤 생성됨 (t=20s)
        let target = Arc::new(DelayedPod::new(4));
        let mut config = VerifierConfig::default();
        config.overall_timeout_secs = 10;
        let mut deadline = AdvisoryDeadline::start(config.overall_timeout());

        let err = run(
            Arc::clone(&target),
            config,
            "my-nb",
            &SnippetSuite::standard(),
            &mut deadline,
        )
        .await
        .expect_err("readiness finished past the overall deadline");

        assert_eq!(err.exit_code(), 6);
        assert!(err.to_string().contains("readiness"), "{err}");
        assert!(target.calls().iter().all(|c| c == "snapshot"));
    }

    fn outcome(success: bool, output: &str) -> SnippetOutcome {
        SnippetOutcome {
            success,
            output: output.to_owned(),
            elapsed_seconds: 0.5,
        }
    }

    fn render(report: &CheckReport) -> String {
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("render succeeds");
        String::from_utf8(buffer).expect("valid UTF-8")
    }

    #[test]
    fn test_report_marks_critical_failures() {
        let mut results = SnippetReport::default();
        results.insert("os", outcome(true, "/opt/app-root/src"));
        results.insert("json", outcome(false, "Traceback (most recent call last):"));
        results.insert("numpy", outcome(false, "ModuleNotFoundError: No module named 'numpy'"));

        let report = CheckReport::new(
            "my-nb-0".to_owned(),
            "my-nb".to_owned(),
            "all".to_owned(),
            results,
            Duration::from_millis(1500),
        );
        assert_eq!(report.critical_failures, vec!["json"]);

        let output = render(&report);
        assert!(output.contains("1/3 checks passed in 1.50s"));
        assert!(output.contains("Critical modules failed:"));
        assert!(output.contains("No module named 'numpy'"));
    }

    #[test]
    fn test_report_all_passed() {
        let mut results = SnippetReport::default();
        results.insert("sys", outcome(true, "3.11.7"));

        let report = CheckReport::new(
            "nb".to_owned(),
            "nb".to_owned(),
            "standard".to_owned(),
            results,
            Duration::from_secs(2),
        );
        assert!(report.critical_failures.is_empty());

        let output = render(&report);
        assert!(output.contains("1/1 checks passed"));
        assert!(!output.contains("Critical"));
    }
}
