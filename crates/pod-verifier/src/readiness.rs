//! 대상 준비 상태 대기
//!
//! 모든 대기는 [`BoundedPoller`] 위에서 동작합니다.
//! Ready에 도달하지 못하면 [`ReadinessFailure`]에 phase와 진단 정보를 담아 반환합니다.

use std::fmt;
use std::time::Duration;

use tracing::{info, warn};

use workbench_probe_core::types::{TargetPhase, TargetSnapshot};

use crate::command::RemoteCommand;
use crate::config::VerifierConfig;
use crate::diagnostics::collect_failure_details;
use crate::error::{ErrorKind, VerifierError};
use crate::poller::{BoundedPoller, Tick};
use crate::target::ExecTarget;

/// Ready 조건 이름
pub const READY_CONDITION: &str = "Ready";

/// 조건 충족 상태 값
pub const CONDITION_TRUE: &str = "True";

/// Ready 대기 실패 정보
///
/// `phase`가 `None`이면 대상이 끝내 생성되지 않은 경우입니다.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadinessFailure {
    /// 대상 이름
    pub target: String,
    /// 실패 시점의 phase
    pub phase: Option<TargetPhase>,
    /// 컨테이너 상태와 로그
    pub details: Option<String>,
    /// 대기를 중단시킨 원인
    pub cause: String,
    /// 적용된 대기 시간
    pub timeout: Duration,
}

impl ReadinessFailure {
    /// 대상이 생성되었는지 여부
    pub fn was_created(&self) -> bool {
        self.phase.is_some()
    }
}

impl fmt::Display for ReadinessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.phase {
            None => write!(
                f,
                "'{}' was not created. Check notebook controller logs. (cause: {})",
                self.target, self.cause
            ),
            Some(phase) => {
                write!(
                    f,
                    "'{}' failed to reach Ready state within {}s.\nPod Phase: {phase}",
                    self.target,
                    self.timeout.as_secs()
                )?;
                if let Some(details) = &self.details {
                    write!(f, "\nError Details:\n{details}")?;
                }
                write!(f, "\nOriginal Error: {}", self.cause)
            }
        }
    }
}

/// 대상이 생성될 때까지 기다립니다.
pub async fn wait_for_existence<T: ExecTarget>(
    target: &T,
    poller: &BoundedPoller,
) -> Result<TargetSnapshot, VerifierError> {
    poller
        .run(move || async move { Ok(Tick::from_option(target.snapshot().await?)) })
        .await
}

/// 조건 `kind`의 상태가 `status`가 될 때까지 기다립니다.
///
/// 대기 중 대상이 사라지면 계속 대기합니다.
pub async fn wait_for_condition<T: ExecTarget>(
    target: &T,
    kind: &str,
    status: &str,
    poller: &BoundedPoller,
) -> Result<TargetSnapshot, VerifierError> {
    poller
        .run(move || async move {
            let snapshot = target
                .snapshot()
                .await?
                .filter(|s| s.has_condition(kind, status));
            Ok(Tick::from_option(snapshot))
        })
        .await
}

/// 대상 생성과 Ready 조건을 차례로 기다립니다.
///
/// 두 단계 모두 `readiness_timeout`을 각각 적용하며, 일시적인 API 에러는 재시도합니다.
///
/// # Errors
///
/// 대기 실패 시 `VerifierError::NotReady`. 실패 시점의 상태를 다시 조회해
/// 진단 정보를 채웁니다.
pub async fn wait_until_ready<T: ExecTarget>(
    target: &T,
    config: &VerifierConfig,
) -> Result<TargetSnapshot, VerifierError> {
    let timeout = config.readiness_timeout();
    let existence = BoundedPoller::new("pod existence", config.poll_interval(), timeout)?
        .ignoring(ErrorKind::Api);
    let ready = BoundedPoller::new("pod ready", config.poll_interval(), timeout)?
        .ignoring(ErrorKind::Api);

    let outcome = match wait_for_existence(target, &existence).await {
        Ok(_) => wait_for_condition(target, READY_CONDITION, CONDITION_TRUE, &ready).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(snapshot) => {
            info!(target_name = target.name(), phase = %snapshot.phase, "target is ready");
            Ok(snapshot)
        }
        Err(e) => {
            let failure = describe_failure(target, config, timeout, &e).await;
            warn!(
                target_name = target.name(),
                created = failure.was_created(),
                error = %e,
                "target did not become ready"
            );
            Err(VerifierError::NotReady(Box::new(failure)))
        }
    }
}

async fn describe_failure<T: ExecTarget>(
    target: &T,
    config: &VerifierConfig,
    timeout: Duration,
    cause: &VerifierError,
) -> ReadinessFailure {
    let snapshot = match target.snapshot().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "failed to fetch state for diagnostics");
            None
        }
    };

    let (phase, details) = match snapshot {
        Some(snapshot) => {
            let details =
                collect_failure_details(target, &snapshot, config.readiness_log_lines).await;
            (Some(snapshot.phase), Some(details))
        }
        None => (None, None),
    };

    ReadinessFailure {
        target: target.name().to_owned(),
        phase,
        details,
        cause: cause.to_string(),
        timeout,
    }
}

/// 컨테이너에 exec 연결이 가능해질 때까지 기다립니다.
///
/// `echo connection_test`를 `connection_poll_interval`마다 실행하고,
/// 실행 에러는 연결 전 상태로 보고 재시도합니다.
pub async fn wait_for_exec_connection<T: ExecTarget>(
    target: &T,
    container: &str,
    config: &VerifierConfig,
) -> Result<(), VerifierError> {
    let poller = BoundedPoller::new(
        "exec connection",
        config.connection_poll_interval(),
        config.connection_timeout(),
    )?
    .ignoring(ErrorKind::Execution)
    .ignoring(ErrorKind::Api)
    .ignoring(ErrorKind::Connection);

    let probe = RemoteCommand::new(vec!["echo".to_owned(), "connection_test".to_owned()]);
    let argv = probe.argv();

    poller
        .run(move || async move {
            target.execute(container, argv).await?;
            Ok(Tick::Satisfied(()))
        })
        .await?;

    info!(target_name = target.name(), container, "exec connection established");
    Ok(())
}
