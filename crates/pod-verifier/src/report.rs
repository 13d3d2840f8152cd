//! 검증 실패 보고서

use crate::verifier::VerificationReport;

/// 보고서에 포함할 로그 발췌 길이 (문자 수)
pub const LOG_EXCERPT_CHARS: usize = 500;

const TROUBLESHOOTING: [&str; 4] = [
    "Verify the custom image contains the required packages",
    "Check if packages are installed in the correct Python environment",
    "Verify package names match import names (pip name vs import name)",
    "Contact the workbench image team for package installation issues",
];

/// 실패한 패키지에 대한 사람이 읽을 보고서를 만듭니다.
///
/// 실패가 없으면 헤더와 해결 안내만 포함됩니다.
pub fn format_package_failure_report(target_name: &str, report: &VerificationReport) -> String {
    let mut out = format!("The following packages are not importable in {target_name}:\n\n");

    for (name, result) in report.iter().filter(|(_, r)| !r.import_successful) {
        out.push_str(&format!(
            "  ❌ {name}:\n     Error: {}\n     Command: {}\n     Execution Time: {:.2}s\n",
            result.error_message.as_deref().unwrap_or("unknown error"),
            result.command_executed,
            result.execution_time_seconds
        ));

        if let Some(logs) = result.pod_logs.as_deref().filter(|l| !l.is_empty()) {
            out.push_str("     Pod Logs (excerpt):\n");
            let excerpt: String = logs.chars().take(LOG_EXCERPT_CHARS).collect();
            for line in excerpt.split('\n') {
                out.push_str(&format!("       {line}\n"));
            }
        }
        out.push('\n');
    }

    out.push_str("Troubleshooting:");
    for (i, hint) in TROUBLESHOOTING.iter().enumerate() {
        out.push_str(&format!("\n  {}. {hint}", i + 1));
    }
    out
}

/// `"{성공}/{전체} packages imported successfully"` 형식의 요약
pub fn summary_line(report: &VerificationReport) -> String {
    format!(
        "{}/{} packages imported successfully",
        report.successful_packages().len(),
        report.len()
    )
}
