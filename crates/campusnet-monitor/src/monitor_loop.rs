//! 주기적 연결 모니터.
//!
//! `stopped`/`running` 두 상태를 갖는다. 실행 중에는 확인 대상을 순서대로 프로브하고,
//! 모두 실패하면 실패 카운터를 올린 뒤 로그인을 디스패처에 넘기고(결과는 기다리지 않음)
//! 설정된 간격만큼 잠든다. 간격은 매 주기 경계에서 다시 읽는다.
//!
//! 실행 상태는 세대 번호를 담은 `watch` 채널로 관리한다. 중지 후 곧바로 재시작해도
//! 이전 세대의 루프는 자기 세대가 아님을 보고 종료하므로 살아 있는 루프는 최대 하나다.

use campusnet_core::config::{validate_endpoints, validate_interval};
use campusnet_core::error::CoreError;
use campusnet_core::models::connectivity::{ConnectivityState, ProbeReport, ProbeTarget};
use campusnet_core::models::status::StatusSource;
use campusnet_core::ports::probe::ConnectivityProbe;
use campusnet_core::ports::status_sink::StatusSink;
use campusnet_network::connectivity::{ConnectionStatus, SharedConnectivityTracker};
use futures::FutureExt;
use parking_lot::RwLock;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::diagnostics::run_diagnostics;
use crate::dispatcher::{DispatchResult, LoginDispatcher, LoginTrigger};

/// 모니터 제어 상태 (실행 여부, 간격, 확인 대상)
pub struct MonitorControl {
    /// 실행 중인 루프의 세대. `None`이면 중지 상태.
    run_state: watch::Sender<Option<u64>>,
    next_generation: AtomicU64,
    interval: RwLock<Duration>,
    endpoints: RwLock<Vec<ProbeTarget>>,
}

impl MonitorControl {
    /// 검증된 간격과 대상 목록으로 생성
    pub fn new(interval_secs: u64, endpoints: Vec<ProbeTarget>) -> Result<Self, CoreError> {
        let interval = validate_interval(interval_secs)?;
        validate_endpoints(&endpoints)?;
        let (run_state, _) = watch::channel(None);
        Ok(Self {
            run_state,
            next_generation: AtomicU64::new(0),
            interval: RwLock::new(interval),
            endpoints: RwLock::new(endpoints),
        })
    }

    pub fn is_running(&self) -> bool {
        self.run_state.borrow().is_some()
    }

    pub fn interval(&self) -> Duration {
        *self.interval.read()
    }

    /// 확인 대상 목록 복사본
    pub fn endpoints(&self) -> Vec<ProbeTarget> {
        self.endpoints.read().clone()
    }

    /// 간격 변경. 하한 미달이면 거부하고 기존 값을 유지한다.
    pub fn set_interval_secs(&self, secs: u64) -> Result<Duration, CoreError> {
        let interval = validate_interval(secs)?;
        *self.interval.write() = interval;
        Ok(interval)
    }

    /// 확인 대상 교체. 빈 목록은 거부한다.
    pub fn set_endpoints(&self, endpoints: Vec<ProbeTarget>) -> Result<(), CoreError> {
        validate_endpoints(&endpoints)?;
        *self.endpoints.write() = endpoints;
        Ok(())
    }

    /// 실행 상태 구독
    pub fn subscribe(&self) -> watch::Receiver<Option<u64>> {
        self.run_state.subscribe()
    }

    /// 중지 상태면 새 세대를 시작해 반환. 이미 실행 중이면 `None`.
    fn begin(&self) -> Option<u64> {
        let mut started = None;
        self.run_state.send_if_modified(|state| {
            if state.is_some() {
                return false;
            }
            let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
            *state = Some(generation);
            started = Some(generation);
            true
        });
        started
    }

    /// 실행 중이었으면 `true`
    fn end(&self) -> bool {
        self.run_state.send_if_modified(|state| state.take().is_some())
    }

    fn is_current(&self, generation: u64) -> bool {
        *self.run_state.borrow() == Some(generation)
    }
}

/// 한 주기 확인 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// 연결된 첫 대상 (없으면 연결 끊김)
    pub reached: Option<ProbeTarget>,
    /// 연결에 실패한 대상
    pub failed: Vec<ProbeTarget>,
    /// 주기 종료 후 연속 실패 횟수
    pub consecutive_failures: u64,
    /// 로그인 요청 결과 (연결 끊김이고 자동 로그인이 켜진 경우)
    pub dispatch: Option<DispatchResult>,
}

impl CycleReport {
    pub fn is_connected(&self) -> bool {
        self.reached.is_some()
    }
}

/// 연결 모니터
pub struct NetworkMonitor {
    control: Arc<MonitorControl>,
    probe: Arc<dyn ConnectivityProbe>,
    /// 자격 증명이 없으면 `None` (자동 로그인 비활성)
    dispatcher: Option<LoginDispatcher>,
    tracker: SharedConnectivityTracker,
    status: Arc<dyn StatusSink>,
    probe_timeout: Duration,
}

impl NetworkMonitor {
    pub fn new(
        control: Arc<MonitorControl>,
        probe: Arc<dyn ConnectivityProbe>,
        dispatcher: Option<LoginDispatcher>,
        tracker: SharedConnectivityTracker,
        status: Arc<dyn StatusSink>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            control,
            probe,
            dispatcher,
            tracker,
            status,
            probe_timeout,
        }
    }

    pub fn control(&self) -> &Arc<MonitorControl> {
        &self.control
    }

    /// 연결 상태 스냅샷
    pub fn state(&self) -> ConnectivityState {
        self.tracker.snapshot()
    }

    /// 연결 상태 요약 (확인 전/정상/끊김)
    pub fn connection_status(&self) -> ConnectionStatus {
        self.tracker.status()
    }

    /// 마지막 확인 이후 경과 시간
    pub fn time_since_last_check(&self) -> Option<Duration> {
        self.tracker.time_since_last_check()
    }

    pub fn auto_login_enabled(&self) -> bool {
        self.dispatcher.is_some()
    }

    /// 모니터 시작. 이미 실행 중이면 아무것도 하지 않고 `false`.
    pub fn start(self: &Arc<Self>) -> bool {
        let Some(generation) = self.control.begin() else {
            debug!("모니터 이미 실행 중");
            return false;
        };

        self.status.info(
            StatusSource::Control,
            format!(
                "모니터 시작 (간격 {}초)",
                self.control.interval().as_secs()
            ),
        );
        tokio::spawn(self.clone().run(generation));
        true
    }

    /// 모니터 중지. 이미 중지 상태면 `false`.
    ///
    /// 진행 중인 주기는 남은 프로브 없이 중단되고, 잠든 루프는 즉시 깨어나 종료한다.
    pub fn stop(&self) -> bool {
        if !self.control.end() {
            debug!("모니터 이미 중지됨");
            return false;
        }
        self.status.info(StatusSource::Control, "모니터 중지 요청".to_string());
        true
    }

    /// 한 주기 확인
    pub async fn check_once(&self) -> CycleReport {
        let endpoints = self.control.endpoints();
        let mut failed = Vec::new();

        for target in endpoints {
            if self.probe.probe(&target, self.probe_timeout).await {
                self.tracker.record_success();
                self.status
                    .info(StatusSource::Monitor, format!("네트워크 정상 ({target})"));
                return CycleReport {
                    reached: Some(target),
                    failed,
                    consecutive_failures: 0,
                    dispatch: None,
                };
            }
            debug!("{target} 연결 실패");
            failed.push(target);
        }

        let consecutive_failures = self.tracker.record_failure();
        self.status.warn(
            StatusSource::Monitor,
            format!("모든 확인 대상 연결 실패 (연속 {consecutive_failures}회)"),
        );

        let dispatch = match &self.dispatcher {
            Some(dispatcher) => {
                let result = dispatcher.dispatch(LoginTrigger::ConnectivityLost);
                if result == DispatchResult::Closed {
                    warn!("로그인 워커가 종료되어 재로그인 요청 불가");
                }
                Some(result)
            }
            None => {
                self.status.warn(
                    StatusSource::Monitor,
                    "자격 증명이 없어 재로그인 건너뜀".to_string(),
                );
                None
            }
        };

        CycleReport {
            reached: None,
            failed,
            consecutive_failures,
            dispatch,
        }
    }

    /// 현재 확인 대상 전체 진단 (연결 상태는 건드리지 않음)
    pub async fn diagnose(&self) -> Vec<ProbeReport> {
        let endpoints = self.control.endpoints();
        run_diagnostics(
            self.probe.as_ref(),
            &endpoints,
            self.probe_timeout,
            self.status.as_ref(),
        )
        .await
    }

    /// 진단을 백그라운드로 실행. 결과는 상태 이벤트로만 보고된다.
    pub fn spawn_diagnostics(self: &Arc<Self>) {
        let monitor = self.clone();
        let task = tokio::spawn(async move { monitor.diagnose().await });
        let status = self.status.clone();

        tokio::spawn(async move {
            if let Err(e) = task.await {
                error!("진단 태스크 비정상 종료: {e}");
                status.error(
                    StatusSource::Diagnostic,
                    "진단 중 예기치 않은 오류".to_string(),
                );
            }
        });
    }

    async fn run(self: Arc<Self>, generation: u64) {
        let mut run_rx = self.control.subscribe();
        info!("모니터 루프 시작 (세대 {generation})");

        loop {
            if !self.control.is_current(generation) {
                break;
            }

            // 중지 요청이 오면 진행 중인 프로브를 버린다 (카운터와 재로그인도 건너뜀)
            tokio::select! {
                cycle = AssertUnwindSafe(self.check_once()).catch_unwind() => match cycle {
                    Ok(report) => debug!("모니터 주기 완료 (연결: {})", report.is_connected()),
                    Err(_) => {
                        error!("모니터 주기 처리 중 패닉, 다음 주기에 계속");
                        self.status.error(
                            StatusSource::Monitor,
                            "연결 확인 중 예기치 않은 오류".to_string(),
                        );
                    }
                },
                _ = run_rx.wait_for(|state| *state != Some(generation)) => break,
            }

            let interval = self.control.interval();
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = run_rx.wait_for(|state| *state != Some(generation)) => break,
            }
        }

        info!("모니터 루프 종료 (세대 {generation})");
        self.status
            .info(StatusSource::Monitor, "모니터 중지됨".to_string());
    }
}
