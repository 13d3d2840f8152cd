//! 전체 실행 권고 기한
//!
//! 여러 단계로 이루어진 검증 시나리오 전체에 적용되는 예산입니다.
//! 실행 중인 작업을 선점하지 않고, 단계 사이의 [`AdvisoryDeadline::checkpoint`]에서만 확인합니다.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::VerifierError;

/// 권고 기한
#[derive(Debug, Clone)]
pub struct AdvisoryDeadline {
    started: Instant,
    budget: Duration,
    checkpoints: u32,
}

impl AdvisoryDeadline {
    /// 지금부터 `budget` 동안 유효한 기한을 시작합니다.
    pub fn start(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
            checkpoints: 0,
        }
    }

    /// 시작 이후 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// 남은 시간 (초과 시 0)
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.elapsed())
    }

    /// 예산
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// 예산 초과 여부
    pub fn exceeded(&self) -> bool {
        self.elapsed() > self.budget
    }

    /// 단계 `phase`가 끝난 시점에 예산을 확인합니다.
    ///
    /// # Errors
    ///
    /// 예산을 넘겼으면 단계 이름을 담은 `VerifierError::Timeout`.
    pub fn checkpoint(&mut self, phase: &str) -> Result<(), VerifierError> {
        self.checkpoints = self.checkpoints.saturating_add(1);
        let elapsed = self.elapsed();
        if elapsed > self.budget {
            warn!(
                phase,
                elapsed_secs = elapsed.as_secs_f64(),
                budget_secs = self.budget.as_secs(),
                "overall timeout exceeded"
            );
            return Err(VerifierError::Timeout {
                operation: format!("overall deadline at '{phase}'"),
                elapsed,
                budget: self.budget,
                attempts: self.checkpoints,
            });
        }
        Ok(())
    }

    /// 실행을 마치고 총 소요 시간을 반환합니다.
    ///
    /// 예산을 넘겼으면 경고만 남깁니다.
    pub fn finish(&self) -> Duration {
        let elapsed = self.elapsed();
        if elapsed > self.budget {
            warn!(
                elapsed_secs = elapsed.as_secs_f64(),
                budget_secs = self.budget.as_secs(),
                "execution time exceeded overall timeout"
            );
        } else {
            info!(
                elapsed_secs = elapsed.as_secs_f64(),
                budget_secs = self.budget.as_secs(),
                "finished within overall timeout"
            );
        }
        elapsed
    }
}
