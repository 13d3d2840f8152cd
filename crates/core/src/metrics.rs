//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::histogram!()`
//! 매크로를 호출합니다. 레코더(exporter) 설치는 호출 측의 몫입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `workbench_probe_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//! use workbench_probe_core::metrics as m;
//!
//! counter!(m::PACKAGE_IMPORTS_TOTAL, m::LABEL_RESULT => "success").increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

/// 대기 작업 레이블 키 (pod_existence, pod_condition, exec_connection, snippet)
pub const LABEL_OPERATION: &str = "operation";

/// 실행 백엔드 레이블 키 (kubernetes, docker)
pub const LABEL_BACKEND: &str = "backend";

// ─── 패키지 검증 메트릭 ─────────────────────────────────────────────

/// 패키지 import 시도 수 (counter, label: result)
pub const PACKAGE_IMPORTS_TOTAL: &str = "workbench_probe_package_imports_total";

/// 패키지 import 소요 시간 (histogram, 초)
pub const PACKAGE_IMPORT_DURATION_SECONDS: &str = "workbench_probe_package_import_duration_seconds";

/// 진단 로그 수집 실패 수 (counter)
pub const DIAGNOSTIC_FAILURES_TOTAL: &str = "workbench_probe_diagnostic_failures_total";

// ─── 폴링 메트릭 ─────────────────────────────────────────────────────

/// 폴링 시도 수 (counter, label: operation)
pub const POLL_ATTEMPTS_TOTAL: &str = "workbench_probe_poll_attempts_total";

/// 폴링 타임아웃 수 (counter, label: operation)
pub const POLL_TIMEOUTS_TOTAL: &str = "workbench_probe_poll_timeouts_total";

// ─── 기능 점검 메트릭 ────────────────────────────────────────────────

/// 코드 스니펫 점검 수 (counter, label: result)
pub const SNIPPET_CHECKS_TOTAL: &str = "workbench_probe_snippet_checks_total";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// import 소요 시간 히스토그램 버킷 (초)
///
/// 50ms ~ 120s 범위 (대형 패키지 첫 import는 수십 초 걸림)
pub const IMPORT_DURATION_BUCKETS: [f64; 9] = [0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        PACKAGE_IMPORTS_TOTAL,
        "Total number of package import attempts by result"
    );
    describe_histogram!(
        PACKAGE_IMPORT_DURATION_SECONDS,
        "Wall-clock duration of a single package import in seconds"
    );
    describe_counter!(
        DIAGNOSTIC_FAILURES_TOTAL,
        "Total number of failed container log retrievals"
    );
    describe_counter!(
        POLL_ATTEMPTS_TOTAL,
        "Total number of probe attempts made by bounded pollers"
    );
    describe_counter!(
        POLL_TIMEOUTS_TOTAL,
        "Total number of bounded polls that exhausted their timeout"
    );
    describe_counter!(
        SNIPPET_CHECKS_TOTAL,
        "Total number of functional snippet checks by result"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        PACKAGE_IMPORTS_TOTAL,
        PACKAGE_IMPORT_DURATION_SECONDS,
        DIAGNOSTIC_FAILURES_TOTAL,
        POLL_ATTEMPTS_TOTAL,
        POLL_TIMEOUTS_TOTAL,
        SNIPPET_CHECKS_TOTAL,
    ];

    #[test]
    fn all_metrics_start_with_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("workbench_probe_"),
                "Metric '{name}' does not start with 'workbench_probe_' prefix"
            );
        }
    }

    #[test]
    fn counters_end_with_total() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.ends_with("_total") || name.ends_with("_seconds"),
                "Metric '{name}' has no unit suffix"
            );
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더 없이 호출해도 panic 없음
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_RESULT, LABEL_OPERATION, LABEL_BACKEND] {
            assert_eq!(label.to_lowercase(), label);
        }
    }

    #[test]
    fn import_duration_buckets_are_sorted() {
        let buckets = IMPORT_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(
                buckets[i] > buckets[i - 1],
                "Bucket values must be in ascending order"
            );
        }
    }
}
