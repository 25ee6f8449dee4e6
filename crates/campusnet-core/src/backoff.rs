//! 선형 백오프 스케줄러.
//!
//! 시작 시 연결 확인 단계에서 사용한다. 대기와 프로브는 호출자 책임이다.

use std::time::Duration;

/// 실패 후 다음 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStep {
    /// 주어진 시간만큼 대기 후 다음 시도
    Retry(Duration),
    /// 최대 시도 횟수 도달
    Exhausted,
}

/// 선형 백오프: `wait(n) = base_delay * n`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffScheduler {
    base_delay: Duration,
    max_attempts: u32,
}

impl BackoffScheduler {
    /// `max_attempts`가 0이면 1로 취급한다.
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// `attempt`(1부터) 실패 후 다음 시도 전 대기 시간
    pub fn wait(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// `attempt`번째 시도가 실패했을 때의 다음 동작
    pub fn after_failure(&self, attempt: u32) -> BackoffStep {
        if attempt >= self.max_attempts {
            BackoffStep::Exhausted
        } else {
            BackoffStep::Retry(self.wait(attempt))
        }
    }

    /// 모든 시도가 실패할 때 누적 대기 시간
    pub fn total_wait(&self) -> Duration {
        (1..self.max_attempts).map(|n| self.wait(n)).sum()
    }
}
