//! 도메인 타입: 검증 대상 워크로드의 상태 표현
//!
//! 클러스터(Kubernetes Pod)나 로컬 Docker 컨테이너 등 실행 대상의 상태를
//! 백엔드와 무관한 공통 형태로 표현합니다.
//! 모든 검증 로직은 이 타입만 보고 판단합니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 대상 워크로드의 생명주기 단계
///
/// Kubernetes Pod의 `status.phase` 값과 1:1로 대응합니다.
/// 알 수 없는 값은 [`TargetPhase::Unknown`]에 원문 그대로 보존합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPhase {
    /// 스케줄링 또는 이미지 풀 대기 중
    Pending,
    /// 실행 중
    Running,
    /// 모든 컨테이너가 정상 종료
    Succeeded,
    /// 하나 이상의 컨테이너가 실패로 종료
    Failed,
    /// 그 밖의 값 (원문 보존)
    Unknown(String),
}

impl TargetPhase {
    /// phase 문자열을 파싱합니다.
    ///
    /// 대소문자를 구분합니다 (`"Running"`만 실행 중으로 인정).
    pub fn parse(s: &str) -> Self {
        match s {
            "Pending" => Self::Pending,
            "Running" => Self::Running,
            "Succeeded" => Self::Succeeded,
            "Failed" => Self::Failed,
            other => Self::Unknown(other.to_owned()),
        }
    }

    /// 실행 중 여부
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

impl fmt::Display for TargetPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Running => write!(f, "Running"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
            Self::Unknown(raw) => write!(f, "{raw}"),
        }
    }
}

/// 컨테이너 리소스 요청/제한
///
/// 값은 Kubernetes quantity 문자열 그대로 저장합니다 (예: `"200m"`, `"128Mi"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    /// 요청량 (cpu, memory 등)
    #[serde(default)]
    pub requests: BTreeMap<String, String>,
    /// 제한량
    #[serde(default)]
    pub limits: BTreeMap<String, String>,
}

/// 컨테이너 선언 정보 (spec)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    /// 컨테이너 이름
    pub name: String,
    /// 이미지
    pub image: Option<String>,
    /// 리소스 요청/제한
    #[serde(default)]
    pub resources: ResourceRequirements,
}

impl ContainerSpec {
    /// 이름만 가진 컨테이너 선언을 생성합니다.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: None,
            resources: ResourceRequirements::default(),
        }
    }
}

/// 컨테이너 실행 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerState {
    /// 시작 대기 중 (예: `ImagePullBackOff`)
    Waiting {
        /// 대기 사유
        reason: Option<String>,
        /// 상세 메시지
        message: Option<String>,
    },
    /// 실행 중
    Running,
    /// 종료됨
    Terminated {
        /// 종료 코드
        exit_code: i32,
        /// 종료 사유
        reason: Option<String>,
    },
    /// 상태 정보 없음
    Unknown,
}

/// 컨테이너 상태 (status)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerStatus {
    /// 컨테이너 이름
    pub name: String,
    /// readiness probe 통과 여부
    pub ready: bool,
    /// 현재 상태
    pub state: ContainerState,
}

/// 대상 상태 조건 (예: `Ready=True`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCondition {
    /// 조건 종류 (Ready, ContainersReady, PodScheduled ...)
    pub kind: String,
    /// 조건 값 (`True`, `False`, `Unknown`)
    pub status: String,
}

/// 검증 대상의 특정 시점 상태
///
/// 실행 백엔드가 조회한 결과를 담으며, 조회 이후에는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    /// 대상 이름 (Pod 이름 또는 컨테이너 이름)
    pub name: String,
    /// 생명주기 단계
    pub phase: TargetPhase,
    /// 선언된 컨테이너 (선언 순서 유지)
    pub containers: Vec<ContainerSpec>,
    /// 컨테이너 상태
    pub container_statuses: Vec<ContainerStatus>,
    /// 상태 조건
    pub conditions: Vec<TargetCondition>,
}

impl TargetSnapshot {
    /// 최소 정보만 가진 스냅샷을 생성합니다.
    pub fn new(name: impl Into<String>, phase: TargetPhase) -> Self {
        Self {
            name: name.into(),
            phase,
            containers: Vec::new(),
            container_statuses: Vec::new(),
            conditions: Vec::new(),
        }
    }

    /// 선언된 컨테이너 이름 목록 (선언 순서)
    pub fn container_names(&self) -> Vec<String> {
        self.containers.iter().map(|c| c.name.clone()).collect()
    }

    /// 이름으로 컨테이너 선언을 찾습니다.
    pub fn container(&self, name: &str) -> Option<&ContainerSpec> {
        self.containers.iter().find(|c| c.name == name)
    }

    /// 조건 값을 조회합니다. 조건이 없으면 `None`.
    pub fn condition_status(&self, kind: &str) -> Option<&str> {
        self.conditions
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.status.as_str())
    }

    /// 조건이 기대값과 일치하는지 확인합니다.
    pub fn has_condition(&self, kind: &str, status: &str) -> bool {
        self.condition_status(kind) == Some(status)
    }
}

impl fmt::Display for TargetSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} phase={} containers=[{}]",
            self.name,
            self.phase,
            self.container_names().join(","),
        )
    }
}
