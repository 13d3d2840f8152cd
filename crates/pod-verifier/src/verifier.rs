//! 패키지 import 검증
//!
//! [`PackageVerifier`]는 대상 컨테이너 안에서 패키지마다
//! `<runtime> -c 'import <pkg>'`를 한 번씩 실행하고,
//! 요청 순서를 유지한 [`VerificationReport`]를 돌려줍니다.
//!
//! # 검사 순서
//!
//! 원격 호출 전에 다음을 순서대로 확인합니다.
//! 1. 패키지 목록이 비어 있으면 Validation
//! 2. 타임아웃이 0이면 Validation
//! 3. 식별자 패턴에 맞지 않는 이름이 있으면 Validation
//! 4. 대상이 없으면 Precondition
//! 5. phase가 Running이 아니면 Precondition
//! 6. 컨테이너가 선언되어 있지 않으면 Precondition
//!
//! 이후 패키지별 실패는 결과에 기록되고 배치 전체를 중단시키지 않습니다.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{Instrument, Span, debug, info, warn};

use workbench_probe_core::metrics as m;

use crate::command::{RemoteCommand, validate_package_name};
use crate::config::VerifierConfig;
use crate::error::{PreconditionFailure, VerifierError};
use crate::target::ExecTarget;

/// 로그 수집 실패 시 `pod_logs`에 들어가는 값
pub const LOG_PLACEHOLDER: &str = "Could not retrieve pod logs";

/// 단일 패키지 검증 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageVerificationResult {
    /// 패키지 이름
    pub package_name: String,
    /// import 성공 여부
    pub import_successful: bool,
    /// 실패 시 에러 메시지
    pub error_message: Option<String>,
    /// 실행한 명령 (표시용)
    pub command_executed: String,
    /// 실행 소요 시간 (초)
    pub execution_time_seconds: f64,
    /// 실패 시 수집한 컨테이너 로그
    pub pod_logs: Option<String>,
    /// 표준 출력
    #[serde(default)]
    pub stdout: String,
    /// 표준 에러 (실패 시 에러 메시지)
    #[serde(default)]
    pub stderr: String,
}

/// 패키지별 검증 결과 (요청 순서 유지)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VerificationReport {
    results: IndexMap<String, PackageVerificationResult>,
}

impl VerificationReport {
    /// 결과를 추가합니다.
    pub fn insert(&mut self, result: PackageVerificationResult) {
        self.results.insert(result.package_name.clone(), result);
    }

    /// 패키지 이름으로 결과를 조회합니다.
    pub fn get(&self, package: &str) -> Option<&PackageVerificationResult> {
        self.results.get(package)
    }

    /// 요청 순서대로 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageVerificationResult)> {
        self.results.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 패키지 이름 목록 (요청 순서)
    pub fn package_names(&self) -> Vec<&str> {
        self.results.keys().map(String::as_str).collect()
    }

    /// 실패한 패키지 (요청 순서)
    pub fn failed_packages(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, r)| !r.import_successful)
            .map(|(name, _)| name)
            .collect()
    }

    /// 성공한 패키지 (요청 순서)
    pub fn successful_packages(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, r)| r.import_successful)
            .map(|(name, _)| name)
            .collect()
    }

    /// 모두 성공했는지 여부
    pub fn all_successful(&self) -> bool {
        self.results.values().all(|r| r.import_successful)
    }

    /// 결과 수
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// 비어 있는지 여부
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// 내부 맵을 꺼냅니다.
    pub fn into_inner(self) -> IndexMap<String, PackageVerificationResult> {
        self.results
    }
}

/// 패키지 import 검증기
///
/// 모든 이벤트는 생성 시 주입된 `tracing::Span` 아래에 기록됩니다
/// (기본값: 생성 시점의 현재 span).
pub struct PackageVerifier<T: ExecTarget> {
    target: Arc<T>,
    config: VerifierConfig,
    span: Span,
}

impl<T: ExecTarget> PackageVerifier<T> {
    /// 새 검증기를 생성합니다.
    pub fn new(target: Arc<T>, config: VerifierConfig) -> Self {
        Self {
            target,
            config,
            span: Span::current(),
        }
    }

    /// 로그를 기록할 span을 지정합니다.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// 검증 대상
    pub fn target(&self) -> &T {
        &self.target
    }

    /// 설정
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// 설정된 패키지별 타임아웃으로 검증합니다.
    pub async fn verify(
        &self,
        container: &str,
        packages: &[String],
    ) -> Result<VerificationReport, VerifierError> {
        self.verify_package_import(container, packages, self.config.package_timeout())
            .await
    }

    /// 컨테이너 안에서 패키지 import를 검증합니다.
    ///
    /// # Errors
    ///
    /// 입력 검증과 사전 조건 실패만 에러로 반환합니다.
    /// 패키지별 실행 실패는 결과에 기록됩니다.
    pub async fn verify_package_import(
        &self,
        container: &str,
        packages: &[String],
        timeout: Duration,
    ) -> Result<VerificationReport, VerifierError> {
        async move {
            validate_request(packages, timeout)?;
            self.check_preconditions(container).await?;

            info!(
                target_name = self.target.name(),
                container,
                count = packages.len(),
                "verifying packages"
            );

            let mut report = VerificationReport::default();
            for package in packages {
                if report.get(package).is_some() {
                    debug!(package = package.as_str(), "duplicate package skipped");
                    continue;
                }
                let result = self.verify_one(container, package, timeout).await;
                report.insert(result);
            }

            info!(
                target_name = self.target.name(),
                successful = report.successful_packages().len(),
                failed = report.failed_packages().len(),
                "package verification finished"
            );
            Ok(report)
        }
        .instrument(self.span.clone())
        .await
    }

    async fn check_preconditions(&self, container: &str) -> Result<(), VerifierError> {
        let name = self.target.name().to_owned();
        let snapshot = self
            .target
            .snapshot()
            .await?
            .ok_or_else(|| PreconditionFailure::TargetMissing {
                target: name.clone(),
            })?;

        if !snapshot.phase.is_running() {
            return Err(PreconditionFailure::NotRunning {
                target: name,
                phase: snapshot.phase.to_string(),
            }
            .into());
        }

        if snapshot.container(container).is_none() {
            return Err(PreconditionFailure::ContainerNotFound {
                target: name,
                container: container.to_owned(),
                available: snapshot.container_names(),
            }
            .into());
        }

        Ok(())
    }

    async fn verify_one(
        &self,
        container: &str,
        package: &str,
        timeout: Duration,
    ) -> PackageVerificationResult {
        let command = RemoteCommand::import(&self.config.runtime, package);
        debug!(command = command.display(), "executing");

        let started = Instant::now();
        let outcome = match tokio::time::timeout(
            timeout,
            self.target.execute(container, command.argv()),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(VerifierError::Timeout {
                operation: format!("import {package}"),
                elapsed: started.elapsed(),
                budget: timeout,
                attempts: 1,
            }),
        };
        let elapsed = started.elapsed().as_secs_f64();
        histogram!(m::PACKAGE_IMPORT_DURATION_SECONDS).record(elapsed);

        match outcome {
            Ok(stdout) => {
                counter!(m::PACKAGE_IMPORTS_TOTAL, m::LABEL_RESULT => "success").increment(1);
                info!(package, elapsed_secs = elapsed, "import successful");
                PackageVerificationResult {
                    package_name: package.to_owned(),
                    import_successful: true,
                    error_message: None,
                    command_executed: command.display().to_owned(),
                    execution_time_seconds: elapsed,
                    pod_logs: None,
                    stdout,
                    stderr: String::new(),
                }
            }
            Err(e) => {
                counter!(m::PACKAGE_IMPORTS_TOTAL, m::LABEL_RESULT => "failure").increment(1);
                let error_message = e.to_string();
                warn!(package, error = %error_message, "import failed");

                let pod_logs = if self.config.collect_diagnostics {
                    Some(self.collect_logs(container).await)
                } else {
                    None
                };

                PackageVerificationResult {
                    package_name: package.to_owned(),
                    import_successful: false,
                    error_message: Some(error_message.clone()),
                    command_executed: command.display().to_owned(),
                    execution_time_seconds: elapsed,
                    pod_logs,
                    stdout: String::new(),
                    stderr: error_message,
                }
            }
        }
    }

    async fn collect_logs(&self, container: &str) -> String {
        match self.target.log(container, self.config.log_tail_lines).await {
            Ok(logs) => logs,
            Err(e) => {
                counter!(m::DIAGNOSTIC_FAILURES_TOTAL).increment(1);
                warn!(container, error = %e, "failed to collect pod logs");
                LOG_PLACEHOLDER.to_owned()
            }
        }
    }
}

/// 원격 호출 없이 검사할 수 있는 입력을 검증합니다.
pub fn validate_request(packages: &[String], timeout: Duration) -> Result<(), VerifierError> {
    if packages.is_empty() {
        return Err(VerifierError::Validation(
            "packages list cannot be empty".to_owned(),
        ));
    }
    if timeout.is_zero() {
        return Err(VerifierError::Validation(
            "timeout must be positive".to_owned(),
        ));
    }
    packages
        .iter()
        .try_for_each(|package| validate_package_name(package))
}
