//! 연결 확인 대상 및 연결 상태 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::CoreError;

/// 연결 확인 대상 (`host:port`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProbeTarget {
    pub host: String,
    pub port: u16,
}

impl ProbeTarget {
    /// 포트 생략 시 기본값
    pub const DEFAULT_PORT: u16 = 80;

    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for ProbeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for ProbeTarget {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |message: String| CoreError::InvalidSetting {
            field: "endpoints",
            message,
        };

        if s.is_empty() {
            return Err(invalid("빈 엔드포인트".to_string()));
        }

        // [IPv6]:port
        if let Some(rest) = s.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| invalid(format!("닫는 괄호 없음: {s}")))?;
            let port = match tail.strip_prefix(':') {
                Some(p) => p.parse().map_err(|_| invalid(format!("잘못된 포트: {s}")))?,
                None if tail.is_empty() => Self::DEFAULT_PORT,
                None => return Err(invalid(format!("잘못된 형식: {s}"))),
            };
            return Ok(Self::new(host, port));
        }

        match s.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => {
                if host.is_empty() {
                    return Err(invalid(format!("호스트 없음: {s}")));
                }
                let port = port
                    .parse()
                    .map_err(|_| invalid(format!("잘못된 포트: {s}")))?;
                Ok(Self::new(host, port))
            }
            // 괄호 없는 IPv6 또는 포트 생략
            _ => Ok(Self::new(s, Self::DEFAULT_PORT)),
        }
    }
}

impl TryFrom<String> for ProbeTarget {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProbeTarget> for String {
    fn from(target: ProbeTarget) -> Self {
        target.to_string()
    }
}

/// 콤마/공백/줄바꿈으로 구분된 엔드포인트 목록 파싱. 빈 목록은 거부한다.
pub fn parse_target_list(input: &str) -> Result<Vec<ProbeTarget>, CoreError> {
    let targets = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.trim().is_empty())
        .map(str::parse)
        .collect::<Result<Vec<ProbeTarget>, _>>()?;

    if targets.is_empty() {
        return Err(CoreError::InvalidSetting {
            field: "endpoints",
            message: "확인 대상 목록이 비어 있음".to_string(),
        });
    }
    Ok(targets)
}

/// 모니터가 관리하는 연결 상태 스냅샷
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectivityState {
    /// 마지막 확인 결과
    pub reachable: bool,
    /// 마지막 확인 시각
    pub last_checked: Option<DateTime<Utc>>,
    /// 연속 실패 횟수
    pub consecutive_failures: u64,
}

/// 지연 시간 진단 결과 (제어 결정에는 쓰지 않음)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub target: ProbeTarget,
    /// 연결 성공 시 소요 시간
    pub latency: Option<Duration>,
    /// 실패 사유
    pub error: Option<String>,
}

impl ProbeReport {
    pub fn is_reachable(&self) -> bool {
        self.latency.is_some()
    }
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.latency, &self.error) {
            (Some(latency), _) => write!(
                f,
                "{}: {:.2}ms",
                self.target,
                latency.as_secs_f64() * 1000.0
            ),
            (None, Some(err)) => write!(f, "{}: 연결 실패 ({err})", self.target),
            (None, None) => write!(f, "{}: 연결 실패", self.target),
        }
    }
}
