//! 검증기 에러 타입
//!
//! [`VerifierError`]는 Pod 검증 과정에서 발생하는 모든 에러를 표현합니다.
//! [`VerifierError::kind`]가 돌려주는 [`ErrorKind`]는
//! [`BoundedPoller`](crate::poller::BoundedPoller)의 무시 가능 에러 집합에 사용됩니다.
//! `From<VerifierError> for WorkbenchError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use std::fmt;
use std::time::Duration;

use workbench_probe_core::error::{ConfigError, TargetError, WorkbenchError};

use crate::readiness::ReadinessFailure;

/// 에러 분류
///
/// 폴러는 이 값으로 에러를 "재시도 가능"과 "치명적"으로 나눕니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 입력값 검증 실패
    Validation,
    /// 사전 조건 불충족
    Precondition,
    /// 원격 명령 실행 실패
    Execution,
    /// 대기 시간 초과
    Timeout,
    /// 진단 정보(로그) 수집 실패
    DiagnosticCollection,
    /// Pod가 Ready 상태에 도달하지 못함
    Readiness,
    /// 클러스터 / Docker API 호출 실패
    Api,
    /// 클라이언트 연결 실패
    Connection,
    /// 설정 에러
    Config,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Precondition => "precondition",
            Self::Execution => "execution",
            Self::Timeout => "timeout",
            Self::DiagnosticCollection => "diagnostic_collection",
            Self::Readiness => "readiness",
            Self::Api => "api",
            Self::Connection => "connection",
            Self::Config => "config",
        };
        f.write_str(name)
    }
}

/// 사전 조건 실패 상세
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreconditionFailure {
    /// 대상이 존재하지 않음
    #[error("target '{target}' does not exist")]
    TargetMissing {
        /// 대상 이름
        target: String,
    },

    /// 대상이 Running 상태가 아님
    #[error("target '{target}' is not in Running state (current: {phase})")]
    NotRunning {
        /// 대상 이름
        target: String,
        /// 실제 phase
        phase: String,
    },

    /// 컨테이너가 대상에 선언되어 있지 않음
    #[error(
        "container '{container}' not found in target '{target}'. Available containers: [{}]",
        .available.join(", ")
    )]
    ContainerNotFound {
        /// 대상 이름
        target: String,
        /// 요청한 컨테이너 이름
        container: String,
        /// 선언된 컨테이너 목록 (선언 순서)
        available: Vec<String>,
    },
}

/// Pod 검증기 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    /// 입력값 검증 실패 (빈 패키지 목록, 잘못된 식별자, 0 타임아웃)
    #[error("validation error: {0}")]
    Validation(String),

    /// 사전 조건 불충족
    #[error("precondition failed: {0}")]
    Precondition(#[from] PreconditionFailure),

    /// 원격 명령 실행 실패 (0이 아닌 종료 코드, exec 스트림 에러)
    #[error("execution failed in container '{container}': {reason}")]
    Execution {
        /// 대상 컨테이너
        container: String,
        /// 실패 사유
        reason: String,
    },

    /// 제한 시간 초과
    #[error(
        "{operation} timed out after {:.2}s (limit: {}s, attempts: {attempts})",
        .elapsed.as_secs_f64(),
        .budget.as_secs()
    )]
    Timeout {
        /// 대기하던 작업
        operation: String,
        /// 실제 경과 시간
        elapsed: Duration,
        /// 설정된 제한 시간
        budget: Duration,
        /// 시도 횟수
        attempts: u32,
    },

    /// 진단 로그 수집 실패
    #[error("diagnostic collection failed: {0}")]
    DiagnosticCollection(String),

    /// Ready 상태 대기 실패 (진단 정보 포함)
    #[error("{0}")]
    NotReady(Box<ReadinessFailure>),

    /// 클러스터 / Docker API 호출 실패
    #[error("api error: {0}")]
    Api(String),

    /// 클라이언트 연결 실패
    #[error("connection error: {0}")]
    Connection(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl VerifierError {
    /// 에러 분류를 반환합니다.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Precondition(_) => ErrorKind::Precondition,
            Self::Execution { .. } => ErrorKind::Execution,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::DiagnosticCollection(_) => ErrorKind::DiagnosticCollection,
            Self::NotReady(_) => ErrorKind::Readiness,
            Self::Api(_) => ErrorKind::Api,
            Self::Connection(_) => ErrorKind::Connection,
            Self::Config { .. } => ErrorKind::Config,
        }
    }
}

impl From<VerifierError> for WorkbenchError {
    fn from(err: VerifierError) -> Self {
        match err {
            VerifierError::Validation(msg) => {
                WorkbenchError::Target(TargetError::Validation(msg))
            }
            VerifierError::Precondition(failure) => {
                WorkbenchError::Target(TargetError::Precondition(failure.to_string()))
            }
            VerifierError::Execution { container, reason } => {
                WorkbenchError::Target(TargetError::Execution { container, reason })
            }
            VerifierError::Timeout { .. } | VerifierError::NotReady(_) => {
                WorkbenchError::Target(TargetError::Timeout(err.to_string()))
            }
            VerifierError::DiagnosticCollection(_)
            | VerifierError::Api(_)
            | VerifierError::Connection(_) => WorkbenchError::Target(TargetError::Api(err.to_string())),
            VerifierError::Config { field, reason } => {
                WorkbenchError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_running_names_actual_phase() {
        let err: VerifierError = PreconditionFailure::NotRunning {
            target: "nb-0".to_owned(),
            phase: "Pending".to_owned(),
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("nb-0"));
        assert!(msg.contains("Pending"));
        assert_eq!(err.kind(), ErrorKind::Precondition);
    }

    #[test]
    fn container_not_found_lists_available() {
        let err = PreconditionFailure::ContainerNotFound {
            target: "nb-0".to_owned(),
            container: "sidecar".to_owned(),
            available: vec!["nb".to_owned(), "kube-rbac-proxy".to_owned()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'sidecar'"));
        assert!(msg.contains("[nb, kube-rbac-proxy]"));
    }

    #[test]
    fn timeout_display_includes_budget_and_attempts() {
        let err = VerifierError::Timeout {
            operation: "pod readiness".to_owned(),
            elapsed: Duration::from_millis(10_250),
            budget: Duration::from_secs(5),
            attempts: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("pod readiness"));
        assert!(msg.contains("10.25s"));
        assert!(msg.contains("limit: 5s"));
        assert!(msg.contains("attempts: 2"));
    }

    #[test]
    fn kind_classification() {
        assert_eq!(
            VerifierError::Validation("x".to_owned()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            VerifierError::Execution {
                container: "c".to_owned(),
                reason: "r".to_owned()
            }
            .kind(),
            ErrorKind::Execution
        );
        assert_eq!(VerifierError::Api("x".to_owned()).kind(), ErrorKind::Api);
        assert_eq!(
            VerifierError::Connection("x".to_owned()).kind(),
            ErrorKind::Connection
        );
    }

    #[test]
    fn converts_execution_to_target_error() {
        let err = VerifierError::Execution {
            container: "nb".to_owned(),
            reason: "exit code 1".to_owned(),
        };
        let top: WorkbenchError = err.into();
        assert!(matches!(
            top,
            WorkbenchError::Target(TargetError::Execution { .. })
        ));
    }

    #[test]
    fn converts_config_to_config_error() {
        let err = VerifierError::Config {
            field: "package_timeout_secs".to_owned(),
            reason: "must be 1-3600".to_owned(),
        };
        let top: WorkbenchError = err.into();
        assert!(matches!(
            top,
            WorkbenchError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn converts_timeout_to_target_timeout() {
        let err = VerifierError::Timeout {
            operation: "exec connection".to_owned(),
            elapsed: Duration::from_secs(30),
            budget: Duration::from_secs(30),
            attempts: 15,
        };
        let top: WorkbenchError = err.into();
        assert!(matches!(top, WorkbenchError::Target(TargetError::Timeout(_))));
    }
}
