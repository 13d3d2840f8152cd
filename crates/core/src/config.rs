//! 설정 관리: workbench-probe.toml 파싱 및 런타임 설정
//!
//! [`ProbeConfig`]는 모든 컴포넌트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`WORKBENCH_PROBE_CLUSTER_NAMESPACE=test-ns` 형식)
//! 3. 설정 파일 (`workbench-probe.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), workbench_probe_core::error::WorkbenchError> {
//! use workbench_probe_core::config::ProbeConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ProbeConfig::load("workbench-probe.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ProbeConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, WorkbenchError};

/// workbench-probe 통합 설정
///
/// `workbench-probe.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 클러스터 접속 설정
    #[serde(default)]
    pub cluster: ClusterConfig,
    /// Pod readiness 대기 설정
    #[serde(default)]
    pub readiness: ReadinessConfig,
    /// 패키지 검증 설정
    #[serde(default)]
    pub verification: VerificationConfig,
}

impl ProbeConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, WorkbenchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, WorkbenchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                WorkbenchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                WorkbenchError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, WorkbenchError> {
        toml::from_str(toml_str).map_err(|e| {
            WorkbenchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `WORKBENCH_PROBE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "WORKBENCH_PROBE_GENERAL_LOG_LEVEL");
        override_string(
            &mut self.general.log_format,
            "WORKBENCH_PROBE_GENERAL_LOG_FORMAT",
        );

        // Cluster
        override_string(
            &mut self.cluster.namespace,
            "WORKBENCH_PROBE_CLUSTER_NAMESPACE",
        );
        override_string(&mut self.cluster.context, "WORKBENCH_PROBE_CLUSTER_CONTEXT");

        // Readiness
        override_u64(
            &mut self.readiness.timeout_secs,
            "WORKBENCH_PROBE_READINESS_TIMEOUT_SECS",
        );
        override_u64(
            &mut self.readiness.poll_interval_secs,
            "WORKBENCH_PROBE_READINESS_POLL_INTERVAL_SECS",
        );
        override_u64(
            &mut self.readiness.connection_timeout_secs,
            "WORKBENCH_PROBE_READINESS_CONNECTION_TIMEOUT_SECS",
        );

        // Verification
        override_string(
            &mut self.verification.runtime,
            "WORKBENCH_PROBE_VERIFICATION_RUNTIME",
        );
        override_u64(
            &mut self.verification.package_timeout_secs,
            "WORKBENCH_PROBE_VERIFICATION_PACKAGE_TIMEOUT_SECS",
        );
        override_bool(
            &mut self.verification.collect_diagnostics,
            "WORKBENCH_PROBE_VERIFICATION_COLLECT_DIAGNOSTICS",
        );
        override_u32(
            &mut self.verification.log_tail_lines,
            "WORKBENCH_PROBE_VERIFICATION_LOG_TAIL_LINES",
        );
        override_u64(
            &mut self.verification.overall_timeout_secs,
            "WORKBENCH_PROBE_VERIFICATION_OVERALL_TIMEOUT_SECS",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), WorkbenchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.cluster.namespace.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "cluster.namespace".to_owned(),
                reason: "namespace must not be empty".to_owned(),
            }
            .into());
        }

        // 0초 대기는 의미가 없으므로 모든 타임아웃/주기는 양수여야 함
        let positive_fields = [
            ("readiness.timeout_secs", self.readiness.timeout_secs),
            ("readiness.poll_interval_secs", self.readiness.poll_interval_secs),
            (
                "readiness.connection_timeout_secs",
                self.readiness.connection_timeout_secs,
            ),
            (
                "verification.package_timeout_secs",
                self.verification.package_timeout_secs,
            ),
            (
                "verification.overall_timeout_secs",
                self.verification.overall_timeout_secs,
            ),
        ];
        for (field, value) in positive_fields {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_owned(),
                    reason: "must be greater than 0".to_owned(),
                }
                .into());
            }
        }

        if self.verification.runtime.trim().is_empty()
            || self.verification.runtime.contains(char::is_whitespace)
        {
            return Err(ConfigError::InvalidValue {
                field: "verification.runtime".to_owned(),
                reason: "runtime must be a single executable name".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 클러스터 접속 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// 기본 네임스페이스
    pub namespace: String,
    /// kubeconfig 컨텍스트 (빈 문자열이면 현재 컨텍스트)
    pub context: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            namespace: "default".to_owned(),
            context: String::new(),
        }
    }
}

/// Pod readiness 대기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Ready 조건 대기 최대 시간 (초). 대형 커스텀 이미지는 풀에 수 분이 걸림
    pub timeout_secs: u64,
    /// 상태 조회 주기 (초)
    pub poll_interval_secs: u64,
    /// exec 연결 확인 최대 시간 (초)
    pub connection_timeout_secs: u64,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            poll_interval_secs: 5,
            connection_timeout_secs: 30,
        }
    }
}

/// 패키지 검증 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationConfig {
    /// import를 실행할 언어 런타임 실행 파일
    pub runtime: String,
    /// 패키지별 import 타임아웃 (초)
    pub package_timeout_secs: u64,
    /// 실패 시 컨테이너 로그 수집 여부
    pub collect_diagnostics: bool,
    /// 수집할 로그 줄 수
    pub log_tail_lines: u32,
    /// 전체 검증 시나리오의 권고 타임아웃 (초)
    pub overall_timeout_secs: u64,
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            runtime: "python".to_owned(),
            package_timeout_secs: 60,
            collect_diagnostics: true,
            log_tail_lines: 100,
            overall_timeout_secs: 300,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = ProbeConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.cluster.namespace, "default");
        assert_eq!(config.readiness.timeout_secs, 600);
        assert_eq!(config.verification.runtime, "python");
        assert_eq!(config.verification.log_tail_lines, 100);
        assert!(config.verification.collect_diagnostics);
    }

    #[test]
    fn default_config_passes_validation() {
        ProbeConfig::default().validate().unwrap();
    }

    #[test]
    fn from_str_empty_toml_uses_defaults() {
        let config = ProbeConfig::parse("").unwrap();
        assert_eq!(config.verification.package_timeout_secs, 60);
        assert_eq!(config.readiness.poll_interval_secs, 5);
    }

    #[test]
    fn from_str_partial_toml_merges_with_defaults() {
        let toml = r#"
[cluster]
namespace = "test-datascience"

[verification]
package_timeout_secs = 120
"#;
        let config = ProbeConfig::parse(toml).unwrap();
        assert_eq!(config.cluster.namespace, "test-datascience");
        assert_eq!(config.verification.package_timeout_secs, 120);
        // runtime은 기본값 유지
        assert_eq!(config.verification.runtime, "python");
    }

    #[test]
    fn from_str_invalid_toml_returns_error() {
        let err = ProbeConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            WorkbenchError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = ProbeConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_empty_namespace() {
        let mut config = ProbeConfig::default();
        config.cluster.namespace = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cluster.namespace"));
    }

    #[test]
    fn validate_rejects_zero_package_timeout() {
        let mut config = ProbeConfig::default();
        config.verification.package_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("package_timeout_secs"));
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let mut config = ProbeConfig::default();
        config.readiness.poll_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_runtime_with_arguments() {
        let mut config = ProbeConfig::default();
        config.verification.runtime = "python -u".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("runtime"));
    }

    #[test]
    #[serial]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: serial 테스트로 실행되어 다른 스레드가 환경변수를 읽지 않습니다.
        unsafe { std::env::set_var("TEST_WORKBENCH_PROBE_STR", "overridden") };
        override_string(&mut val, "TEST_WORKBENCH_PROBE_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_WORKBENCH_PROBE_STR") };
    }

    #[test]
    #[serial]
    fn env_override_bool_invalid_keeps_original() {
        let mut val = true;
        // SAFETY: serial 테스트로 실행되어 다른 스레드가 환경변수를 읽지 않습니다.
        unsafe { std::env::set_var("TEST_WORKBENCH_PROBE_BOOL_BAD", "maybe") };
        override_bool(&mut val, "TEST_WORKBENCH_PROBE_BOOL_BAD");
        assert!(val);
        unsafe { std::env::remove_var("TEST_WORKBENCH_PROBE_BOOL_BAD") };
    }

    #[test]
    #[serial]
    fn env_override_applies_to_config_sections() {
        let mut config = ProbeConfig::default();
        // SAFETY: serial 테스트로 실행되어 다른 스레드가 환경변수를 읽지 않습니다.
        unsafe {
            std::env::set_var("WORKBENCH_PROBE_CLUSTER_NAMESPACE", "test-sdg-hub");
            std::env::set_var("WORKBENCH_PROBE_VERIFICATION_LOG_TAIL_LINES", "50");
        }
        config.apply_env_overrides();
        assert_eq!(config.cluster.namespace, "test-sdg-hub");
        assert_eq!(config.verification.log_tail_lines, 50);
        unsafe {
            std::env::remove_var("WORKBENCH_PROBE_CLUSTER_NAMESPACE");
            std::env::remove_var("WORKBENCH_PROBE_VERIFICATION_LOG_TAIL_LINES");
        }
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = 42u64;
        override_u64(&mut val, "TEST_WORKBENCH_PROBE_NONEXISTENT_12345");
        assert_eq!(val, 42);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = ProbeConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = ProbeConfig::parse(&toml_str).unwrap();
        assert_eq!(config.cluster.namespace, parsed.cluster.namespace);
        assert_eq!(
            config.verification.package_timeout_secs,
            parsed.verification.package_timeout_secs
        );
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = ProbeConfig::from_file("/nonexistent/path/workbench-probe.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkbenchError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
