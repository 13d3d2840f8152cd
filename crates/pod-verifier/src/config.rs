//! 검증기 설정
//!
//! [`VerifierConfig`]는 core의 [`ProbeConfig`]의
//! `[readiness]`, `[verification]` 섹션을 기반으로 검증기 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use workbench_probe_core::config::ProbeConfig;
//! use workbench_pod_verifier::config::VerifierConfig;
//!
//! let core_config = ProbeConfig::default();
//! let config = VerifierConfig::from_core(&core_config);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use workbench_probe_core::config::ProbeConfig;

use crate::error::VerifierError;

/// 검증기 설정
///
/// core의 `ProbeConfig`에서 파생되며, 검증기 내부에서
/// 사용하는 추가 설정을 포함합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// import를 실행할 언어 런타임
    pub runtime: String,
    /// 패키지별 import 타임아웃 (초)
    pub package_timeout_secs: u64,
    /// 실패 시 컨테이너 로그 수집 여부
    pub collect_diagnostics: bool,
    /// 실패 시 수집할 로그 줄 수
    pub log_tail_lines: u32,
    /// Ready 조건 대기 최대 시간 (초)
    pub readiness_timeout_secs: u64,
    /// 상태 조회 주기 (초)
    pub poll_interval_secs: u64,
    /// exec 연결 확인 최대 시간 (초)
    pub connection_timeout_secs: u64,
    /// 전체 시나리오 권고 타임아웃 (초)
    pub overall_timeout_secs: u64,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// exec 연결 확인 주기 (초)
    pub connection_poll_interval_secs: u64,
    /// 스니펫 실행 재시도 간격 (초)
    pub snippet_retry_interval_secs: u64,
    /// Ready 실패 진단에 포함할 로그 줄 수
    pub readiness_log_lines: u32,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            runtime: "python".to_owned(),
            package_timeout_secs: 60,
            collect_diagnostics: true,
            log_tail_lines: 100,
            readiness_timeout_secs: 600,
            poll_interval_secs: 5,
            connection_timeout_secs: 30,
            overall_timeout_secs: 300,
            connection_poll_interval_secs: 2,
            snippet_retry_interval_secs: 1,
            readiness_log_lines: 50,
        }
    }
}

/// 설정 상한값 상수
const MAX_PACKAGE_TIMEOUT_SECS: u64 = 3600;
const MAX_READINESS_TIMEOUT_SECS: u64 = 7200;
const MAX_POLL_INTERVAL_SECS: u64 = 300;
const MAX_LOG_TAIL_LINES: u32 = 10_000;
const MAX_OVERALL_TIMEOUT_SECS: u64 = 86_400;

impl VerifierConfig {
    /// core의 `ProbeConfig`에서 검증기 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &ProbeConfig) -> Self {
        Self {
            runtime: core.verification.runtime.clone(),
            package_timeout_secs: core.verification.package_timeout_secs,
            collect_diagnostics: core.verification.collect_diagnostics,
            log_tail_lines: core.verification.log_tail_lines,
            readiness_timeout_secs: core.readiness.timeout_secs,
            poll_interval_secs: core.readiness.poll_interval_secs,
            connection_timeout_secs: core.readiness.connection_timeout_secs,
            overall_timeout_secs: core.verification.overall_timeout_secs,
            ..Self::default()
        }
    }

    /// 패키지별 타임아웃
    pub fn package_timeout(&self) -> Duration {
        Duration::from_secs(self.package_timeout_secs)
    }

    /// Ready 대기 타임아웃
    pub fn readiness_timeout(&self) -> Duration {
        Duration::from_secs(self.readiness_timeout_secs)
    }

    /// 상태 조회 주기
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// exec 연결 확인 타임아웃
    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_secs)
    }

    /// exec 연결 확인 주기
    pub fn connection_poll_interval(&self) -> Duration {
        Duration::from_secs(self.connection_poll_interval_secs)
    }

    /// 스니펫 재시도 간격
    pub fn snippet_retry_interval(&self) -> Duration {
        Duration::from_secs(self.snippet_retry_interval_secs)
    }

    /// 전체 권고 타임아웃
    pub fn overall_timeout(&self) -> Duration {
        Duration::from_secs(self.overall_timeout_secs)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), VerifierError> {
        if self.runtime.is_empty() || self.runtime.contains(char::is_whitespace) {
            return Err(VerifierError::Config {
                field: "runtime".to_owned(),
                reason: "must be a single executable name".to_owned(),
            });
        }

        if self.package_timeout_secs == 0 || self.package_timeout_secs > MAX_PACKAGE_TIMEOUT_SECS {
            return Err(VerifierError::Config {
                field: "package_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_PACKAGE_TIMEOUT_SECS}"),
            });
        }

        if self.readiness_timeout_secs == 0
            || self.readiness_timeout_secs > MAX_READINESS_TIMEOUT_SECS
        {
            return Err(VerifierError::Config {
                field: "readiness_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_READINESS_TIMEOUT_SECS}"),
            });
        }

        for (field, value) in [
            ("poll_interval_secs", self.poll_interval_secs),
            (
                "connection_poll_interval_secs",
                self.connection_poll_interval_secs,
            ),
            (
                "snippet_retry_interval_secs",
                self.snippet_retry_interval_secs,
            ),
        ] {
            if value == 0 || value > MAX_POLL_INTERVAL_SECS {
                return Err(VerifierError::Config {
                    field: field.to_owned(),
                    reason: format!("must be 1-{MAX_POLL_INTERVAL_SECS}"),
                });
            }
        }

        if self.connection_timeout_secs == 0
            || self.connection_timeout_secs > MAX_READINESS_TIMEOUT_SECS
        {
            return Err(VerifierError::Config {
                field: "connection_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_READINESS_TIMEOUT_SECS}"),
            });
        }

        if self.overall_timeout_secs == 0 || self.overall_timeout_secs > MAX_OVERALL_TIMEOUT_SECS {
            return Err(VerifierError::Config {
                field: "overall_timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_OVERALL_TIMEOUT_SECS}"),
            });
        }

        if self.log_tail_lines > MAX_LOG_TAIL_LINES || self.readiness_log_lines > MAX_LOG_TAIL_LINES
        {
            return Err(VerifierError::Config {
                field: "log_tail_lines".to_owned(),
                reason: format!("must be 0-{MAX_LOG_TAIL_LINES}"),
            });
        }

        Ok(())
    }
}

/// 검증기 설정 빌더
#[derive(Default)]
pub struct VerifierConfigBuilder {
    config: VerifierConfig,
}

impl VerifierConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 언어 런타임을 설정합니다.
    pub fn runtime(mut self, runtime: impl Into<String>) -> Self {
        self.config.runtime = runtime.into();
        self
    }

    /// 패키지별 타임아웃(초)을 설정합니다.
    pub fn package_timeout_secs(mut self, secs: u64) -> Self {
        self.config.package_timeout_secs = secs;
        self
    }

    /// 실패 시 로그 수집 여부를 설정합니다.
    pub fn collect_diagnostics(mut self, collect: bool) -> Self {
        self.config.collect_diagnostics = collect;
        self
    }

    /// 수집할 로그 줄 수를 설정합니다.
    pub fn log_tail_lines(mut self, lines: u32) -> Self {
        self.config.log_tail_lines = lines;
        self
    }

    /// Ready 대기 타임아웃(초)을 설정합니다.
    pub fn readiness_timeout_secs(mut self, secs: u64) -> Self {
        self.config.readiness_timeout_secs = secs;
        self
    }

    /// 상태 조회 주기(초)를 설정합니다.
    pub fn poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.poll_interval_secs = secs;
        self
    }

    /// exec 연결 확인 타임아웃(초)을 설정합니다.
    pub fn connection_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connection_timeout_secs = secs;
        self
    }

    /// 전체 권고 타임아웃(초)을 설정합니다.
    pub fn overall_timeout_secs(mut self, secs: u64) -> Self {
        self.config.overall_timeout_secs = secs;
        self
    }

    /// 설정을 검증하고 `VerifierConfig`를 생성합니다.
    pub fn build(self) -> Result<VerifierConfig, VerifierError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        VerifierConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let mut core = ProbeConfig::default();
        core.verification.runtime = "python3".to_owned();
        core.verification.package_timeout_secs = 120;
        core.verification.collect_diagnostics = false;
        core.readiness.timeout_secs = 300;
        core.readiness.poll_interval_secs = 3;

        let config = VerifierConfig::from_core(&core);
        assert_eq!(config.runtime, "python3");
        assert_eq!(config.package_timeout_secs, 120);
        assert!(!config.collect_diagnostics);
        assert_eq!(config.readiness_timeout_secs, 300);
        assert_eq!(config.poll_interval_secs, 3);
        // 확장 필드는 기본값
        assert_eq!(config.connection_poll_interval_secs, 2);
        assert_eq!(config.readiness_log_lines, 50);
    }

    #[test]
    fn duration_accessors() {
        let config = VerifierConfig::default();
        assert_eq!(config.package_timeout(), Duration::from_secs(60));
        assert_eq!(config.readiness_timeout(), Duration::from_secs(600));
        assert_eq!(config.connection_poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn validate_rejects_zero_package_timeout() {
        let config = VerifierConfig {
            package_timeout_secs: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("package_timeout_secs"));
    }

    #[test]
    fn validate_rejects_excessive_package_timeout() {
        let config = VerifierConfig {
            package_timeout_secs: MAX_PACKAGE_TIMEOUT_SECS + 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let config = VerifierConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("poll_interval_secs"));
    }

    #[test]
    fn validate_rejects_runtime_with_spaces() {
        let config = VerifierConfig {
            runtime: "python -u".to_owned(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn builder_creates_valid_config() {
        let config = VerifierConfigBuilder::new()
            .runtime("python3")
            .package_timeout_secs(30)
            .collect_diagnostics(false)
            .log_tail_lines(20)
            .build()
            .unwrap();
        assert_eq!(config.runtime, "python3");
        assert_eq!(config.package_timeout_secs, 30);
        assert!(!config.collect_diagnostics);
        assert_eq!(config.log_tail_lines, 20);
    }

    #[test]
    fn builder_rejects_invalid_config() {
        let result = VerifierConfigBuilder::new().overall_timeout_secs(0).build();
        assert!(result.is_err());
    }
}
