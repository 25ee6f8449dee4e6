//! 연결 상태 추적.
//!
//! 모니터가 프로브 결과를 기록하고, 표시 계층은 스냅샷과 상태 요약을 읽는다.
//! 상태 갱신은 `watch` 채널 내부 잠금 아래에서 이루어져 실패 카운터 유실이 없다.

use campusnet_core::models::connectivity::ConnectivityState;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 연결 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// 아직 확인 전
    Unknown,
    /// 연결됨
    Connected,
    /// 연결 끊김
    Disconnected,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Unknown => write!(f, "확인 전"),
            ConnectionStatus::Connected => write!(f, "정상"),
            ConnectionStatus::Disconnected => write!(f, "끊김"),
        }
    }
}

impl ConnectionStatus {
    fn of(state: &ConnectivityState) -> Self {
        match (state.last_checked, state.reachable) {
            (None, _) => ConnectionStatus::Unknown,
            (Some(_), true) => ConnectionStatus::Connected,
            (Some(_), false) => ConnectionStatus::Disconnected,
        }
    }
}

/// 연결 상태 추적기
pub struct ConnectivityTracker {
    state_tx: watch::Sender<ConnectivityState>,
}

impl ConnectivityTracker {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(ConnectivityState::default());
        Self { state_tx }
    }

    /// 현재 상태 스냅샷
    pub fn snapshot(&self) -> ConnectivityState {
        self.state_tx.borrow().clone()
    }

    /// 현재 연결 상태
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus::of(&self.state_tx.borrow())
    }

    /// 연결 성공 기록, 실패 카운터 리셋
    pub fn record_success(&self) {
        let mut recovered = false;
        self.state_tx.send_modify(|state| {
            recovered = state.last_checked.is_some() && !state.reachable;
            state.reachable = true;
            state.consecutive_failures = 0;
            state.last_checked = Some(Utc::now());
        });

        if recovered {
            info!("연결 복구됨");
        }
    }

    /// 연결 실패 기록. 갱신된 연속 실패 횟수를 반환한다.
    pub fn record_failure(&self) -> u64 {
        let mut count = 0;
        let mut was_reachable = false;
        self.state_tx.send_modify(|state| {
            was_reachable = state.reachable;
            state.reachable = false;
            state.consecutive_failures += 1;
            state.last_checked = Some(Utc::now());
            count = state.consecutive_failures;
        });

        if was_reachable {
            warn!("연결 끊김 감지");
        }
        debug!("연결 실패 기록 (연속 {}회)", count);
        count
    }

    /// 마지막 확인 이후 경과 시간 (확인 전이면 `None`)
    pub fn time_since_last_check(&self) -> Option<Duration> {
        let last = self.state_tx.borrow().last_checked?;
        (Utc::now() - last).to_std().ok()
    }
}

impl Default for ConnectivityTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Arc로 감싼 ConnectivityTracker
pub type SharedConnectivityTracker = Arc<ConnectivityTracker>;
