//! Ready 실패 진단
//!
//! Pod가 Ready 상태에 도달하지 못했을 때 컨테이너 상태와 최근 로그를 모아
//! 사람이 읽을 수 있는 진단 문자열을 만듭니다.

use workbench_probe_core::types::{ContainerState, TargetSnapshot};

use crate::target::ExecTarget;

/// 대기(waiting) 사유 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitingCategory {
    /// 이미지 풀 재시도 대기
    ImagePullBackOff,
    /// 컨테이너 반복 크래시
    CrashLoopBackOff,
    /// 이미지 풀 실패
    ErrImagePull,
    /// 그 밖의 사유
    Other,
}

impl WaitingCategory {
    /// 대기 사유 문자열을 분류합니다.
    pub fn classify(reason: Option<&str>) -> Self {
        match reason {
            Some("ImagePullBackOff") => Self::ImagePullBackOff,
            Some("CrashLoopBackOff") => Self::CrashLoopBackOff,
            Some("ErrImagePull") => Self::ErrImagePull,
            _ => Self::Other,
        }
    }

    /// 분류별 요약과 조치 안내
    pub fn guidance(self) -> Option<(&'static str, &'static str)> {
        match self {
            Self::ImagePullBackOff => Some((
                "ImagePullBackOff: Failed to pull custom image",
                "Verify registry access and image URL",
            )),
            Self::CrashLoopBackOff => Some((
                "CrashLoopBackOff: Container is crashing",
                "Check container logs for startup errors",
            )),
            Self::ErrImagePull => Some((
                "ErrImagePull: Cannot pull image",
                "Verify image exists and cluster has pull access",
            )),
            Self::Other => None,
        }
    }
}

/// phase와 컨테이너별 상태를 렌더링합니다.
pub fn render_container_statuses(snapshot: &TargetSnapshot) -> String {
    let mut out = format!("Phase: {}", snapshot.phase);

    if snapshot.container_statuses.is_empty() {
        return out;
    }

    out.push_str("\n\nContainer Statuses:");
    for status in &snapshot.container_statuses {
        out.push_str(&format!("\n  - {}: ready={}", status.name, status.ready));

        match &status.state {
            ContainerState::Waiting { reason, message } => {
                let message = message.as_deref().unwrap_or_default();
                match WaitingCategory::classify(reason.as_deref()).guidance() {
                    Some((summary, hint)) => out.push_str(&format!(
                        "\n    ! {summary}\n    {hint}\n    Message: {message}"
                    )),
                    None => out.push_str(&format!(
                        "\n    Waiting Reason: {}\n    Message: {message}",
                        reason.as_deref().unwrap_or("unknown")
                    )),
                }
            }
            ContainerState::Terminated { exit_code, reason } => {
                out.push_str(&format!(
                    "\n    ! Container terminated\n    Exit Code: {exit_code}\n    Reason: {}",
                    reason.as_deref().unwrap_or("unknown")
                ));
            }
            ContainerState::Running | ContainerState::Unknown => {}
        }
    }

    out
}

/// 컨테이너 상태와 첫 번째 컨테이너의 최근 로그를 모읍니다.
///
/// 로그 조회 실패는 에러가 아니라 안내 문구로 기록됩니다.
pub async fn collect_failure_details<T: ExecTarget>(
    target: &T,
    snapshot: &TargetSnapshot,
    log_lines: u32,
) -> String {
    let mut details = render_container_statuses(snapshot);

    let Some(first) = snapshot.containers.first() else {
        details.push_str("\n\n(No containers declared)");
        return details;
    };

    match target.log(&first.name, log_lines).await {
        Ok(logs) if !logs.is_empty() => {
            details.push_str(&format!("\n\nRecent Logs (last {log_lines} lines):\n{logs}"));
        }
        Ok(_) => {}
        Err(e) => {
            tracing::debug!(container = first.name.as_str(), error = %e, "log retrieval failed");
            details.push_str("\n\n(Could not retrieve pod logs)");
        }
    }

    details
}
