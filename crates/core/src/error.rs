//! 에러 타입: 도메인별 에러 정의

/// workbench-probe 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum WorkbenchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 검증 대상 관련 에러
    #[error("target error: {0}")]
    Target(#[from] TargetError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 검증 대상(Pod, 컨테이너) 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    /// 입력값 검증 실패
    #[error("validation failed: {0}")]
    Validation(String),

    /// 사전 조건 불충족 (존재하지 않음, 실행 중 아님, 컨테이너 없음)
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// 원격 명령 실행 실패
    #[error("execution failed in container '{container}': {reason}")]
    Execution { container: String, reason: String },

    /// 대기 시간 초과
    #[error("timed out: {0}")]
    Timeout(String),

    /// 클러스터 / Docker API 호출 실패
    #[error("api error: {0}")]
    Api(String),
}
