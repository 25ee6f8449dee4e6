//! 상태 이벤트 허브.
//!
//! `tokio::broadcast` 기반 실시간 구독 + 최근 이벤트 이력 + tracing 영구 로그.

use campusnet_core::models::status::{StatusEvent, StatusLevel};
use campusnet_core::ports::status_sink::StatusSink;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// 영구 로그에 기록되는 tracing target
pub const STATUS_LOG_TARGET: &str = "campusnet::status";

/// `StatusSink` 구현
pub struct StatusHub {
    tx: broadcast::Sender<StatusEvent>,
    history: Mutex<VecDeque<StatusEvent>>,
    history_capacity: usize,
}

impl StatusHub {
    /// 새 허브 생성
    pub fn new(history_capacity: usize, broadcast_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(broadcast_capacity.max(1));
        Self {
            tx,
            history: Mutex::new(VecDeque::with_capacity(history_capacity)),
            history_capacity,
        }
    }

    /// 실시간 구독자 생성
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.tx.subscribe()
    }

    /// 최근 `limit`개 이벤트 (오래된 것부터)
    pub fn recent(&self, limit: usize) -> Vec<StatusEvent> {
        let history = self.history.lock();
        let skip = history.len().saturating_sub(limit);
        history.iter().skip(skip).cloned().collect()
    }

    /// 보관 중인 이벤트 수
    pub fn len(&self) -> usize {
        self.history.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn log(event: &StatusEvent) {
        match event.level {
            StatusLevel::Info => {
                info!(target: STATUS_LOG_TARGET, source = %event.source, "{}", event.message)
            }
            StatusLevel::Warn => {
                warn!(target: STATUS_LOG_TARGET, source = %event.source, "{}", event.message)
            }
            StatusLevel::Error => {
                error!(target: STATUS_LOG_TARGET, source = %event.source, "{}", event.message)
            }
        }
    }
}

impl Default for StatusHub {
    fn default() -> Self {
        Self::new(500, 256)
    }
}

impl StatusSink for StatusHub {
    fn publish(&self, event: StatusEvent) {
        Self::log(&event);

        // 이력 추가와 브로드캐스트를 같은 잠금 아래에서 수행해 두 순서를 일치시킨다
        let mut history = self.history.lock();
        if self.history_capacity > 0 {
            if history.len() == self.history_capacity {
                history.pop_front();
            }
            history.push_back(event.clone());
        }
        if self.tx.send(event).is_err() {
            debug!("상태 이벤트 구독자 없음");
        }
    }
}
