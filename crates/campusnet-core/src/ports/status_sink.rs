//! 상태 이벤트 싱크 포트.
//!
//! 구현: `campusnet-monitor` crate (`StatusHub`)

use crate::models::status::{StatusEvent, StatusLevel, StatusSource};

/// 추가 전용 상태 이벤트 싱크.
///
/// 여러 백그라운드 태스크에서 동시에 호출된다. 같은 발행자의 순서만 보장한다.
pub trait StatusSink: Send + Sync {
    /// 이벤트 추가
    fn publish(&self, event: StatusEvent);

    fn info(&self, source: StatusSource, message: String) {
        self.publish(StatusEvent::now(source, StatusLevel::Info, message));
    }

    fn warn(&self, source: StatusSource, message: String) {
        self.publish(StatusEvent::now(source, StatusLevel::Warn, message));
    }

    fn error(&self, source: StatusSource, message: String) {
        self.publish(StatusEvent::now(source, StatusLevel::Error, message));
    }
}
