//! 인증 사이드카 리소스 검사
//!
//! Notebook에 `notebooks.opendatahub.io/auth-sidecar-*` annotation으로 지정한
//! 요청/제한 값이 `kube-rbac-proxy` 컨테이너에 실제로 반영되었는지 확인합니다.

use std::collections::BTreeMap;
use std::fmt;

use workbench_probe_core::types::TargetSnapshot;

use crate::error::{PreconditionFailure, VerifierError};

/// 인증 사이드카 컨테이너 이름
pub const AUTH_SIDECAR_CONTAINER: &str = "kube-rbac-proxy";

/// 사이드카 리소스 annotation 접두사
pub const ANNOTATION_PREFIX: &str = "notebooks.opendatahub.io/auth-sidecar-";

/// 검사 대상 리소스 항목
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceField {
    CpuRequest,
    MemoryRequest,
    CpuLimit,
    MemoryLimit,
}

impl ResourceField {
    /// 모든 항목 (보고 순서)
    pub const ALL: [Self; 4] = [
        Self::CpuRequest,
        Self::MemoryRequest,
        Self::CpuLimit,
        Self::MemoryLimit,
    ];

    /// annotation 키의 접두사 뒤 부분
    pub fn annotation_suffix(self) -> &'static str {
        match self {
            Self::CpuRequest => "cpu-request",
            Self::MemoryRequest => "memory-request",
            Self::CpuLimit => "cpu-limit",
            Self::MemoryLimit => "memory-limit",
        }
    }

    /// 전체 annotation 키
    pub fn annotation_key(self) -> String {
        format!("{ANNOTATION_PREFIX}{}", self.annotation_suffix())
    }

    /// 리소스 이름 (`cpu` / `memory`)
    pub fn resource(self) -> &'static str {
        match self {
            Self::CpuRequest | Self::CpuLimit => "cpu",
            Self::MemoryRequest | Self::MemoryLimit => "memory",
        }
    }

    /// limits 항목 여부
    pub fn is_limit(self) -> bool {
        matches!(self, Self::CpuLimit | Self::MemoryLimit)
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.annotation_suffix() == suffix)
    }
}

impl fmt::Display for ResourceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::CpuRequest => "CPU request",
            Self::MemoryRequest => "memory request",
            Self::CpuLimit => "CPU limit",
            Self::MemoryLimit => "memory limit",
        };
        f.write_str(label)
    }
}

/// annotation에서 읽은 기대값
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedSidecarResources {
    values: BTreeMap<ResourceField, String>,
}

impl ExpectedSidecarResources {
    /// annotation 목록에서 기대값을 추출합니다.
    ///
    /// 접두사가 다른 annotation은 무시합니다.
    ///
    /// # Errors
    ///
    /// - 접두사는 맞지만 알 수 없는 항목이면 `VerifierError::Validation`
    /// - 사이드카 annotation이 하나도 없으면 `VerifierError::Validation`
    pub fn from_annotations<'a>(
        annotations: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, VerifierError> {
        let mut values = BTreeMap::new();
        for (key, value) in annotations {
            let Some(suffix) = key.strip_prefix(ANNOTATION_PREFIX) else {
                continue;
            };
            let field = ResourceField::from_suffix(suffix).ok_or_else(|| {
                VerifierError::Validation(format!("unknown auth sidecar annotation '{key}'"))
            })?;
            values.insert(field, value.trim().to_owned());
        }

        if values.is_empty() {
            return Err(VerifierError::Validation(format!(
                "no '{ANNOTATION_PREFIX}*' annotations given"
            )));
        }
        Ok(Self { values })
    }

    /// 항목의 기대값
    pub fn get(&self, field: ResourceField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// 기대값과 실제값의 불일치
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceMismatch {
    pub field: ResourceField,
    pub expected: String,
    /// 컨테이너에 값이 없으면 `None`
    pub actual: Option<String>,
}

impl fmt::Display for ResourceMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Expected {} '{}', got '{}'",
            self.field,
            self.expected,
            self.actual.as_deref().unwrap_or("<unset>")
        )
    }
}

/// 사이드카 컨테이너의 리소스를 기대값과 비교합니다.
///
/// 불일치 항목을 모두 반환하며, 빈 목록이면 일치입니다.
///
/// # Errors
///
/// 사이드카 컨테이너가 없으면 `PreconditionFailure::ContainerNotFound`.
pub fn check_auth_sidecar_resources(
    snapshot: &TargetSnapshot,
    expected: &ExpectedSidecarResources,
) -> Result<Vec<ResourceMismatch>, VerifierError> {
    let sidecar = snapshot.container(AUTH_SIDECAR_CONTAINER).ok_or_else(|| {
        PreconditionFailure::ContainerNotFound {
            target: snapshot.name.clone(),
            container: AUTH_SIDECAR_CONTAINER.to_owned(),
            available: snapshot.container_names(),
        }
    })?;

    let mismatches = ResourceField::ALL
        .into_iter()
        .filter_map(|field| {
            let want = expected.get(field)?;
            let section = if field.is_limit() {
                &sidecar.resources.limits
            } else {
                &sidecar.resources.requests
            };
            let actual = section.get(field.resource()).cloned();
            (actual.as_deref() != Some(want)).then(|| ResourceMismatch {
                field,
                expected: want.to_owned(),
                actual,
            })
        })
        .collect::<Vec<_>>();

    for mismatch in &mismatches {
        tracing::warn!(
            target_name = snapshot.name.as_str(),
            field = %mismatch.field,
            "{mismatch}"
        );
    }

    Ok(mismatches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use workbench_probe_core::types::{ContainerSpec, ResourceRequirements, TargetPhase};

    fn annotations() -> Vec<(&'static str, &'static str)> {
        vec![
            ("notebooks.opendatahub.io/auth-sidecar-cpu-request", "200m"),
            ("notebooks.opendatahub.io/auth-sidecar-memory-request", "128Mi"),
            ("notebooks.opendatahub.io/auth-sidecar-cpu-limit", "500m"),
            ("notebooks.opendatahub.io/auth-sidecar-memory-limit", "256Mi"),
            ("notebooks.opendatahub.io/inject-auth", "true"),
        ]
    }

    fn to_map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    fn snapshot(requests: &[(&str, &str)], limits: &[(&str, &str)]) -> TargetSnapshot {
        let mut sidecar = ContainerSpec::named(AUTH_SIDECAR_CONTAINER);
        sidecar.resources = ResourceRequirements {
            requests: to_map(requests),
            limits: to_map(limits),
        };
        let mut snapshot = TargetSnapshot::new("nb-0", TargetPhase::Running);
        snapshot.containers = vec![ContainerSpec::named("nb"), sidecar];
        snapshot
    }

    #[test]
    fn annotations_are_parsed() {
        let expected = ExpectedSidecarResources::from_annotations(annotations()).unwrap();
        assert_eq!(expected.len(), 4);
        assert_eq!(expected.get(ResourceField::CpuRequest), Some("200m"));
        assert_eq!(expected.get(ResourceField::MemoryLimit), Some("256Mi"));
    }

    #[test]
    fn unknown_sidecar_annotation_is_rejected() {
        let err = ExpectedSidecarResources::from_annotations([(
            "notebooks.opendatahub.io/auth-sidecar-gpu-limit",
            "1",
        )])
        .unwrap_err();
        assert!(err.to_string().contains("gpu-limit"));
    }

    #[test]
    fn missing_sidecar_annotations_are_rejected() {
        let err =
            ExpectedSidecarResources::from_annotations([("other/annotation", "x")]).unwrap_err();
        assert!(matches!(err, VerifierError::Validation(_)));
    }

    #[test]
    fn matching_resources_have_no_mismatch() {
        let expected = ExpectedSidecarResources::from_annotations(annotations()).unwrap();
        let snapshot = snapshot(
            &[("cpu", "200m"), ("memory", "128Mi")],
            &[("cpu", "500m"), ("memory", "256Mi")],
        );
        assert!(check_auth_sidecar_resources(&snapshot, &expected)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn every_mismatch_is_reported() {
        let expected = ExpectedSidecarResources::from_annotations(annotations()).unwrap();
        let snapshot = snapshot(&[("cpu", "100m"), ("memory", "128Mi")], &[("cpu", "500m")]);
        let mismatches = check_auth_sidecar_resources(&snapshot, &expected).unwrap();

        assert_eq!(mismatches.len(), 2);
        assert_eq!(
            mismatches[0].to_string(),
            "Expected CPU request '200m', got '100m'"
        );
        assert_eq!(mismatches[1].field, ResourceField::MemoryLimit);
        assert_eq!(mismatches[1].actual, None);
        assert_eq!(
            mismatches[1].to_string(),
            "Expected memory limit '256Mi', got '<unset>'"
        );
    }

    #[test]
    fn partial_expectations_only_check_given_fields() {
        let expected = ExpectedSidecarResources::from_annotations([(
            "notebooks.opendatahub.io/auth-sidecar-cpu-limit",
            "500m",
        )])
        .unwrap();
        let snapshot = snapshot(&[], &[("cpu", "500m")]);
        assert!(check_auth_sidecar_resources(&snapshot, &expected)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn missing_sidecar_lists_available_containers() {
        let expected = ExpectedSidecarResources::from_annotations(annotations()).unwrap();
        let mut snapshot = TargetSnapshot::new("nb-0", TargetPhase::Running);
        snapshot.containers = vec![ContainerSpec::named("nb")];

        let err = check_auth_sidecar_resources(&snapshot, &expected).unwrap_err();
        match err {
            VerifierError::Precondition(PreconditionFailure::ContainerNotFound {
                container,
                available,
                ..
            }) => {
                assert_eq!(container, AUTH_SIDECAR_CONTAINER);
                assert_eq!(available, vec!["nb"]);
            }
            other => panic!("expected ContainerNotFound, got {other:?}"),
        }
    }
}
