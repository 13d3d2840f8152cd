//! 기능 스니펫 검사
//!
//! import만으로는 알 수 없는 동작(예: numpy 연산, matplotlib figure 생성)을
//! 짧은 코드 조각으로 확인합니다. 스니펫은 [`BoundedPoller`]로 실행되므로
//! 일시적인 API/연결 에러는 스니펫 타임아웃까지 재시도됩니다.

use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexMap;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{Instrument, Span, debug, info, warn};

use workbench_probe_core::metrics as m;

use crate::command::RemoteCommand;
use crate::config::VerifierConfig;
use crate::deadline::AdvisoryDeadline;
use crate::error::{ErrorKind, VerifierError};
use crate::poller::{BoundedPoller, Tick};
use crate::target::ExecTarget;

/// 반드시 통과해야 하는 표준 라이브러리 검사
pub const CRITICAL_PACKAGES: [&str; 3] = ["os", "sys", "json"];

const STANDARD_TIMEOUT: Duration = Duration::from_secs(30);
const DATA_SCIENCE_TIMEOUT: Duration = Duration::from_secs(60);

/// 출력에 이 단어가 포함되면 실패로 분류 (대소문자 무시)
const FAILURE_MARKERS: [&str; 3] = ["error", "exception", "traceback"];

/// 단일 스니펫 검사
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetCheck {
    /// 검사 이름 (보통 패키지 이름)
    pub name: String,
    /// 실행할 코드
    pub code: String,
    /// 재시도를 포함한 제한 시간
    pub timeout: Duration,
}

impl SnippetCheck {
    /// 새 검사를 생성합니다.
    pub fn new(name: impl Into<String>, code: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            timeout,
        }
    }
}

/// 순서가 있는 스니펫 검사 묶음
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetSuite {
    checks: Vec<SnippetCheck>,
}

impl SnippetSuite {
    /// 빈 묶음에서 시작합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 검사를 추가합니다.
    pub fn with_check(mut self, check: SnippetCheck) -> Self {
        self.checks.push(check);
        self
    }

    /// 표준 라이브러리 검사 (os, sys, json, datetime)
    pub fn standard() -> Self {
        [
            ("os", "import os; assert hasattr(os, 'path')"),
            ("sys", "import sys; assert hasattr(sys, 'version')"),
            (
                "json",
                r#"import json; assert json.dumps({'test': 'value'}) == '{"test": "value"}'"#,
            ),
            (
                "datetime",
                "import datetime; assert datetime.datetime.now() is not None",
            ),
        ]
        .into_iter()
        .fold(Self::new(), |suite, (name, code)| {
            suite.with_check(SnippetCheck::new(name, code, STANDARD_TIMEOUT))
        })
    }

    /// 데이터 과학 패키지 검사 (numpy, pandas, matplotlib, sklearn)
    pub fn data_science() -> Self {
        [
            ("numpy", "import numpy as np; assert np.array([1,2,3]).sum() == 6"),
            (
                "pandas",
                "import pandas as pd; assert len(pd.DataFrame({'a': [1,2,3]})) == 3",
            ),
            (
                "matplotlib",
                "import matplotlib.pyplot as plt; plt.figure()",
            ),
            (
                "sklearn",
                "from sklearn.datasets import make_classification; make_classification(n_samples=10)",
            ),
        ]
        .into_iter()
        .fold(Self::new(), |suite, (name, code)| {
            suite.with_check(SnippetCheck::new(name, code, DATA_SCIENCE_TIMEOUT))
        })
    }

    /// 표준 + 데이터 과학
    pub fn all() -> Self {
        let mut suite = Self::standard();
        suite.checks.extend(Self::data_science().checks);
        suite
    }

    /// 이름으로 내장 묶음을 찾습니다 (`standard`, `data-science`, `all`).
    pub fn by_name(name: &str) -> Result<Self, VerifierError> {
        match name {
            "standard" => Ok(Self::standard()),
            "data-science" => Ok(Self::data_science()),
            "all" => Ok(Self::all()),
            other => Err(VerifierError::Validation(format!(
                "unknown snippet suite '{other}' (expected standard, data-science or all)"
            ))),
        }
    }

    /// 검사 목록
    pub fn checks(&self) -> &[SnippetCheck] {
        &self.checks
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

/// 스니펫 실행 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetOutcome {
    /// 성공 여부
    pub success: bool,
    /// stdout 또는 실패 설명
    pub output: String,
    /// 재시도를 포함한 소요 시간 (초)
    pub elapsed_seconds: f64,
}

/// 검사 이름 → 결과 (실행 순서 유지)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnippetReport {
    outcomes: IndexMap<String, SnippetOutcome>,
}

impl SnippetReport {
    /// 결과를 추가합니다.
    pub fn insert(&mut self, name: impl Into<String>, outcome: SnippetOutcome) {
        self.outcomes.insert(name.into(), outcome);
    }

    pub fn get(&self, name: &str) -> Option<&SnippetOutcome> {
        self.outcomes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SnippetOutcome)> {
        self.outcomes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 실패한 검사 이름 (실행 순서)
    pub fn failed(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, o)| !o.success)
            .map(|(name, _)| name)
            .collect()
    }

    /// 성공한 검사 이름 (실행 순서)
    pub fn successful(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, o)| o.success)
            .map(|(name, _)| name)
            .collect()
    }

    /// 실행되었지만 실패한 필수 검사
    ///
    /// 실행되지 않은 필수 검사는 포함하지 않습니다.
    pub fn critical_failures(&self) -> Vec<&'static str> {
        CRITICAL_PACKAGES
            .into_iter()
            .filter(|name| self.get(name).is_some_and(|o| !o.success))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

/// 출력이 실패를 나타내는지 판단합니다.
pub fn output_indicates_failure(output: &str) -> bool {
    let lowered = output.to_lowercase();
    FAILURE_MARKERS.iter().any(|marker| lowered.contains(marker))
}

/// 스니펫 실행기
pub struct SnippetRunner<T: ExecTarget> {
    target: Arc<T>,
    config: VerifierConfig,
    span: Span,
}

impl<T: ExecTarget> SnippetRunner<T> {
    /// 새 실행기를 생성합니다. 로그는 현재 span 아래에 기록됩니다.
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

    /// 코드 조각을 실행합니다.
    ///
    /// # Errors
    ///
    /// `timeout`이 0이면 `VerifierError::Validation`.
    /// 실행 실패와 타임아웃은 실패한 [`SnippetOutcome`]으로 반환됩니다.
    pub async fn run_snippet(
        &self,
        container: &str,
        code: &str,
        timeout: Duration,
    ) -> Result<SnippetOutcome, VerifierError> {
        let poller = BoundedPoller::new(
            "snippet execution",
            self.config.snippet_retry_interval(),
            timeout,
        )?
        .ignoring(ErrorKind::Api)
        .ignoring(ErrorKind::Connection);

        let command = RemoteCommand::snippet(&self.config.runtime, code);
        debug!(command = command.display(), "executing snippet");

        let target = self.target.as_ref();
        let argv = command.argv();
        let started = Instant::now();
        let result = poller
            .run(move || async move {
                match tokio::time::timeout(timeout, target.execute(container, argv)).await {
                    Ok(output) => output.map(Tick::Satisfied),
                    Err(_elapsed) => Err(VerifierError::Timeout {
                        operation: "snippet execution".to_owned(),
                        elapsed: timeout,
                        budget: timeout,
                        attempts: 1,
                    }),
                }
            })
            .await;
        let elapsed_seconds = started.elapsed().as_secs_f64();

        let outcome = match result {
            Ok(output) => SnippetOutcome {
                success: !output_indicates_failure(&output),
                output,
                elapsed_seconds,
            },
            Err(VerifierError::Timeout { .. }) => SnippetOutcome {
                success: false,
                output: format!(
                    "Code execution timeout after {elapsed_seconds:.2}s (limit: {}s)",
                    timeout.as_secs()
                ),
                elapsed_seconds,
            },
            Err(e) => SnippetOutcome {
                success: false,
                output: format!("Pod execution failed: {e}"),
                elapsed_seconds,
            },
        };

        let result_label = if outcome.success { "success" } else { "failure" };
        counter!(m::SNIPPET_CHECKS_TOTAL, m::LABEL_RESULT => result_label).increment(1);
        Ok(outcome)
    }

    /// 검사 하나를 실행합니다.
    pub async fn run_check(
        &self,
        container: &str,
        check: &SnippetCheck,
    ) -> Result<SnippetOutcome, VerifierError> {
        let outcome = self.run_snippet(container, &check.code, check.timeout).await?;
        if outcome.success {
            info!(
                check = check.name.as_str(),
                elapsed_secs = outcome.elapsed_seconds,
                "snippet check passed"
            );
        } else {
            warn!(
                check = check.name.as_str(),
                output = outcome.output.as_str(),
                "snippet check failed"
            );
        }
        Ok(outcome)
    }

    /// 묶음 전체를 순서대로 실행합니다.
    ///
    /// 검사마다 `deadline`을 확인합니다.
    ///
    /// # Errors
    ///
    /// - 검사 타임아웃 설정이 0이면 `VerifierError::Validation`
    /// - 전체 기한을 넘기면 `VerifierError::Timeout`
    pub async fn run_suite(
        &self,
        container: &str,
        suite: &SnippetSuite,
        deadline: &mut AdvisoryDeadline,
    ) -> Result<SnippetReport, VerifierError> {
        async move {
            info!(
                target_name = self.target.name(),
                container,
                checks = suite.len(),
                "running snippet checks"
            );

            let mut report = SnippetReport::default();
            for check in suite.checks() {
                let outcome = self.run_check(container, check).await?;
                report.insert(check.name.clone(), outcome);
                deadline.checkpoint(&format!("snippet {}", check.name))?;
            }

            info!(
                "{}/{} snippet checks passed",
                report.successful().len(),
                report.len()
            );
            Ok(report)
        }
        .instrument(self.span.clone())
        .await
    }
}
