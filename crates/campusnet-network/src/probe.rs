//! TCP 연결 확인 프로브.
//!
//! `ConnectivityProbe` 포트 구현. 데이터는 주고받지 않고 연결 성립 여부만 본다.

use async_trait::async_trait;
use campusnet_core::models::connectivity::{ProbeReport, ProbeTarget};
use campusnet_core::ports::probe::ConnectivityProbe;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::{debug, trace};

/// TCP 핸드셰이크 기반 프로브 (상태 없음)
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

impl TcpProbe {
    pub fn new() -> Self {
        Self
    }

    /// DNS 조회를 포함한 연결 시도. 성립 즉시 소켓을 닫는다.
    async fn connect(target: &ProbeTarget, timeout: Duration) -> Result<Duration, String> {
        let started = Instant::now();
        let attempt = TcpStream::connect((target.host.as_str(), target.port));

        match tokio::time::timeout(timeout, attempt).await {
            Ok(Ok(stream)) => {
                let elapsed = started.elapsed();
                drop(stream);
                Ok(elapsed)
            }
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!("{}ms 내 연결되지 않음", timeout.as_millis())),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn probe(&self, target: &ProbeTarget, timeout: Duration) -> bool {
        match Self::connect(target, timeout).await {
            Ok(elapsed) => {
                trace!("연결 성공: {target} ({elapsed:?})");
                true
            }
            Err(e) => {
                debug!("연결 실패: {target}: {e}");
                false
            }
        }
    }

    async fn probe_latency(&self, target: &ProbeTarget, timeout: Duration) -> ProbeReport {
        match Self::connect(target, timeout).await {
            Ok(elapsed) => ProbeReport {
                target: target.clone(),
                latency: Some(elapsed),
                error: None,
            },
            Err(e) => ProbeReport {
                target: target.clone(),
                latency: None,
                error: Some(e),
            },
        }
    }
}
