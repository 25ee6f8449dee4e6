//! 단발성 진단 프로브.
//!
//! 모든 확인 대상에 동시에 연결을 시도해 지연 시간을 보고한다. 진단 결과는
//! 연결 상태나 로그인 판단에 쓰이지 않는다.

use campusnet_core::models::connectivity::{ProbeReport, ProbeTarget};
use campusnet_core::models::status::StatusSource;
use campusnet_core::ports::probe::ConnectivityProbe;
use campusnet_core::ports::status_sink::StatusSink;
use futures::future::join_all;
use std::time::Duration;

/// 전체 대상 진단. 결과는 입력 순서를 따른다.
pub async fn run_diagnostics(
    probe: &dyn ConnectivityProbe,
    endpoints: &[ProbeTarget],
    timeout: Duration,
    status: &dyn StatusSink,
) -> Vec<ProbeReport> {
    status.info(
        StatusSource::Diagnostic,
        format!("진단 시작: {}개 대상", endpoints.len()),
    );

    let reports = join_all(
        endpoints
            .iter()
            .map(|target| probe.probe_latency(target, timeout)),
    )
    .await;

    for report in &reports {
        if report.is_reachable() {
            status.info(StatusSource::Diagnostic, report.to_string());
        } else {
            status.warn(StatusSource::Diagnostic, report.to_string());
        }
    }

    let reachable = reports.iter().filter(|r| r.is_reachable()).count();
    status.info(
        StatusSource::Diagnostic,
        format!("진단 완료: {reachable}/{} 연결 가능", reports.len()),
    );
    reports
}
