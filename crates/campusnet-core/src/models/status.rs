//! 상태 이벤트 모델.
//!
//! 프로브, 게이트, 로그인 클라이언트, 모니터가 발행하고 표시 계층이 소비한다.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 이벤트 발행 주체
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusSource {
    /// 시작 시 연결 확인 + 백오프 단계
    InitialConnect,
    /// 주기적 연결 모니터
    Monitor,
    /// 로그인 요청/응답
    Login,
    /// 수동 지연 시간 진단
    Diagnostic,
    /// 설정/제어면
    Control,
}

impl StatusSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusSource::InitialConnect => "initial-connect",
            StatusSource::Monitor => "monitor",
            StatusSource::Login => "login",
            StatusSource::Diagnostic => "diagnostic",
            StatusSource::Control => "control",
        }
    }
}

impl fmt::Display for StatusSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 이벤트 수준
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

/// 타임스탬프가 붙은 상태 이벤트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub timestamp: DateTime<Utc>,
    pub source: StatusSource,
    pub level: StatusLevel,
    pub message: String,
}

impl StatusEvent {
    /// 현재 시각으로 이벤트 생성
    pub fn now(source: StatusSource, level: StatusLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            source,
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.level {
            StatusLevel::Info => "✅",
            StatusLevel::Warn => "⚠️",
            StatusLevel::Error => "❌",
        };
        write!(
            f,
            "[{}] {marker} ({}) {}",
            self.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            self.source,
            self.message
        )
    }
}
