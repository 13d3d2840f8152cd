//! 제한 시간 폴링
//!
//! [`BoundedPoller`]는 probe가 [`Tick::Satisfied`]를 돌려주거나,
//! 제한 시간이 지나거나, 무시할 수 없는 에러가 날 때까지 probe를 반복 호출합니다.
//!
//! - tick은 순차적으로 실행되고, 한 probe가 끝난 뒤 `interval`만큼 쉬고 다음 probe를 시작합니다.
//! - 제한 시간이 `interval`보다 짧아도 probe는 최소 한 번 실행됩니다.
//! - 제한 시간 이후에 시작되는 probe는 없습니다. 다음 probe 시작 시각이 제한 시간을
//!   넘으면 기다리지 않고 바로 `VerifierError::Timeout`을 반환합니다.
//! - 무시 가능 집합에 속한 에러는 debug 로그를 남기고 [`Tick::Pending`]으로 취급합니다.

use std::future::Future;
use std::time::Duration;

use metrics::counter;
use tokio::time::Instant;
use tracing::{debug, warn};

use workbench_probe_core::metrics as m;

use crate::error::{ErrorKind, VerifierError};

/// 한 번의 probe 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick<T> {
    /// 아직 조건 불충족, 재시도
    Pending,
    /// 조건 충족, 값 반환
    Satisfied(T),
}

impl<T> Tick<T> {
    /// `Some`이면 충족, `None`이면 대기
    pub fn from_option(value: Option<T>) -> Self {
        match value {
            Some(v) => Self::Satisfied(v),
            None => Self::Pending,
        }
    }

    /// 충족 여부
    pub fn is_satisfied(&self) -> bool {
        matches!(self, Self::Satisfied(_))
    }
}

impl Tick<()> {
    /// `true`이면 충족
    pub fn from_bool(done: bool) -> Self {
        if done { Self::Satisfied(()) } else { Self::Pending }
    }
}

/// 제한 시간 폴러
#[derive(Debug, Clone)]
pub struct BoundedPoller {
    operation: String,
    interval: Duration,
    timeout: Duration,
    ignorable: Vec<ErrorKind>,
}

impl BoundedPoller {
    /// 새 폴러를 생성합니다.
    ///
    /// # Errors
    ///
    /// `interval` 또는 `timeout`이 0이면 `VerifierError::Validation`.
    pub fn new(
        operation: impl Into<String>,
        interval: Duration,
        timeout: Duration,
    ) -> Result<Self, VerifierError> {
        let operation = operation.into();
        if interval.is_zero() {
            return Err(VerifierError::Validation(format!(
                "{operation}: poll interval must be positive"
            )));
        }
        if timeout.is_zero() {
            return Err(VerifierError::Validation(format!(
                "{operation}: timeout must be positive"
            )));
        }
        Ok(Self {
            operation,
            interval,
            timeout,
            ignorable: Vec::new(),
        })
    }

    /// 대기로 취급할 에러 종류를 추가합니다.
    pub fn ignoring(mut self, kind: ErrorKind) -> Self {
        if !self.ignorable.contains(&kind) {
            self.ignorable.push(kind);
        }
        self
    }

    /// 작업 이름
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// 재시도 간격
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 제한 시간
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// probe를 반복 실행합니다.
    ///
    /// # Errors
    ///
    /// - 무시 불가능한 probe 에러는 즉시 그대로 반환
    /// - 제한 시간 초과 시 `VerifierError::Timeout`
    pub async fn run<T, F, Fut>(&self, mut probe: F) -> Result<T, VerifierError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Tick<T>, VerifierError>>,
    {
        let started = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            counter!(m::POLL_ATTEMPTS_TOTAL, m::LABEL_OPERATION => self.operation.clone())
                .increment(1);

            match probe().await {
                Ok(Tick::Satisfied(value)) => {
                    debug!(
                        operation = %self.operation,
                        attempts,
                        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                        "poll satisfied"
                    );
                    return Ok(value);
                }
                Ok(Tick::Pending) => {}
                Err(e) if self.ignorable.contains(&e.kind()) => {
                    debug!(
                        operation = %self.operation,
                        attempt = attempts,
                        error = %e,
                        "ignorable probe error, retrying"
                    );
                }
                Err(e) => return Err(e),
            }

            // 다음 probe가 제한 시간 안에 시작될 수 없으면 여기서 종료
            let elapsed = started.elapsed();
            if elapsed.saturating_add(self.interval) > self.timeout {
                counter!(m::POLL_TIMEOUTS_TOTAL, m::LABEL_OPERATION => self.operation.clone())
                    .increment(1);
                warn!(
                    operation = %self.operation,
                    attempts,
                    timeout_secs = self.timeout.as_secs(),
                    "poll timed out"
                );
                return Err(VerifierError::Timeout {
                    operation: self.operation.clone(),
                    elapsed,
                    budget: self.timeout,
                    attempts,
                });
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}
