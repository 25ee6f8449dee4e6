//! 연결 확인 포트.
//!
//! 구현: `campusnet-network` crate (`TcpProbe`)

use async_trait::async_trait;
use std::time::Duration;

use crate::models::connectivity::{ProbeReport, ProbeTarget};

/// 단발성 도달성 확인.
///
/// 상태를 갖지 않으며 모든 실패(연결 거부, 타임아웃, DNS 실패)는 `false`로 수렴한다.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// `timeout` 안에 전송 계층 연결이 성립하면 `true`
    async fn probe(&self, target: &ProbeTarget, timeout: Duration) -> bool;

    /// 진단용: 연결 소요 시간 또는 실패 사유 반환
    async fn probe_latency(&self, target: &ProbeTarget, timeout: Duration) -> ProbeReport;
}
