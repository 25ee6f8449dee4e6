//! 어댑터 와이어링 + 제어 동작.
//!
//! 설정에서 프로브, 로그인 클라이언트, 디스패처, 게이트, 모니터를 만들어 묶는다.
//! 자격 증명이 불완전하면 자동 로그인만 끄고 나머지는 정상 기동한다.

use anyhow::{Context, Result};
use campusnet_core::config::AppConfig;
use campusnet_core::config_manager::ConfigManager;
use campusnet_core::error::CoreError;
use campusnet_core::models::connectivity::{parse_target_list, ConnectivityState};
use campusnet_core::models::status::{StatusEvent, StatusSource};
use campusnet_core::ports::login_client::LoginClient;
use campusnet_core::ports::probe::ConnectivityProbe;
use campusnet_core::ports::status_sink::StatusSink;
use campusnet_monitor::dispatcher::{DispatchResult, LoginDispatcher, LoginTrigger};
use campusnet_monitor::gate::{GateOutcome, InitialConnect, InitialConnectReport};
use campusnet_monitor::monitor_loop::{MonitorControl, NetworkMonitor};
use campusnet_monitor::status::StatusHub;
use campusnet_network::connectivity::{ConnectionStatus, ConnectivityTracker};
use campusnet_network::login_client::HttpLoginClient;
use campusnet_network::probe::TcpProbe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

/// 조립된 에이전트
pub struct CampusNet {
    status: Arc<StatusHub>,
    monitor: Arc<NetworkMonitor>,
    dispatcher: Option<LoginDispatcher>,
    initial: InitialConnect,
    /// 시작 시 연결 확인이 끝나면 모니터 자동 시작
    autostart_monitor: bool,
    initial_done: AtomicBool,
    /// 제어면 변경 사항 저장용 (테스트에서는 `None`)
    config_manager: Option<ConfigManager>,
}

impl CampusNet {
    /// 실제 TCP 프로브 + HTTP 로그인 클라이언트로 조립
    pub fn build(config: &AppConfig, config_manager: Option<ConfigManager>) -> Result<Self> {
        let client = HttpLoginClient::new(config.login_timeout(), &config.login.user_agent)
            .context("로그인 클라이언트 생성 실패")?;
        Self::with_adapters(
            config,
            Arc::new(TcpProbe::new()),
            Arc::new(client),
            config_manager,
        )
    }

    /// 주어진 어댑터로 조립
    pub fn with_adapters(
        config: &AppConfig,
        probe: Arc<dyn ConnectivityProbe>,
        client: Arc<dyn LoginClient>,
        config_manager: Option<ConfigManager>,
    ) -> Result<Self> {
        let status = Arc::new(StatusHub::new(
            config.status.history_capacity,
            config.status.broadcast_capacity,
        ));
        let sink: Arc<dyn StatusSink> = status.clone();

        let dispatcher = match config.credentials.to_credentials() {
            Ok(credentials) => {
                info!("자동 로그인 활성: {}", credentials.account_id());
                Some(LoginDispatcher::spawn(
                    client,
                    Arc::new(credentials),
                    sink.clone(),
                ))
            }
            Err(e) => {
                warn!("자동 로그인 비활성: {e}");
                sink.error(
                    StatusSource::Control,
                    format!("자동 로그인 비활성화: {e}"),
                );
                None
            }
        };

        let control = Arc::new(
            MonitorControl::new(config.monitor.interval_secs, config.monitor.endpoints.clone())
                .context("모니터 설정 오류")?,
        );
        let monitor = Arc::new(NetworkMonitor::new(
            control,
            probe.clone(),
            dispatcher.clone(),
            Arc::new(ConnectivityTracker::new()),
            sink.clone(),
            config.monitor.probe_timeout(),
        ));

        let initial = InitialConnect::new(
            probe,
            config.gate.target.clone(),
            config.gate.probe_timeout(),
            config.gate.scheduler(),
            sink,
        );

        Ok(Self {
            status,
            monitor,
            dispatcher,
            initial,
            autostart_monitor: config.monitor.enabled,
            initial_done: AtomicBool::new(false),
            config_manager,
        })
    }

    pub fn status_hub(&self) -> &Arc<StatusHub> {
        &self.status
    }

    pub fn monitor(&self) -> &Arc<NetworkMonitor> {
        &self.monitor
    }

    pub fn auto_login_enabled(&self) -> bool {
        self.dispatcher.is_some()
    }

    pub fn initial_phase_done(&self) -> bool {
        self.initial_done.load(Ordering::Acquire)
    }

    /// 시작 시 연결 확인 후 첫 로그인 (자격 증명이 없으면 연결 확인만)
    pub async fn initial_connect(
        &self,
        shutdown: &mut watch::Receiver<bool>,
    ) -> InitialConnectReport {
        let report = match &self.dispatcher {
            Some(dispatcher) => self.initial.run(dispatcher, shutdown).await,
            None => InitialConnectReport {
                gate: self.initial.wait_for_network(shutdown).await,
                login: None,
            },
        };
        self.initial_done.store(true, Ordering::Release);
        report
    }

    /// [`initial_connect`](Self::initial_connect) 후 설정에 따라 모니터를 시작한다.
    pub async fn run_startup(&self, shutdown: &mut watch::Receiver<bool>) -> InitialConnectReport {
        let report = self.initial_connect(shutdown).await;

        if report.gate == GateOutcome::Cancelled {
            info!("시작 단계 중단됨");
            return report;
        }
        if self.autostart_monitor {
            self.monitor.start();
        }
        report
    }

    /// 모니터 시작. 시작 시 연결 확인 중에는 거부한다.
    pub fn start_monitor(&self) -> Result<bool, CoreError> {
        if !self.initial_phase_done() {
            return Err(CoreError::Internal(
                "시작 시 연결 확인이 끝난 뒤 모니터를 시작할 수 있음".to_string(),
            ));
        }
        Ok(self.monitor.start())
    }

    pub fn stop_monitor(&self) -> bool {
        self.monitor.stop()
    }

    /// 모니터 간격 변경 후 설정 파일에 반영
    pub fn set_interval(&self, secs: u64) -> Result<Duration, CoreError> {
        let interval = self.monitor.control().set_interval_secs(secs)?;
        self.status.info(
            StatusSource::Control,
            format!("모니터 간격 변경: {secs}초 (다음 주기부터 적용)"),
        );
        self.persist(|config| config.monitor.interval_secs = secs);
        Ok(interval)
    }

    /// 확인 대상 교체 후 설정 파일에 반영
    pub fn set_endpoints(&self, input: &str) -> Result<usize, CoreError> {
        let endpoints = parse_target_list(input)?;
        let count = endpoints.len();
        self.monitor.control().set_endpoints(endpoints.clone())?;
        self.status.info(
            StatusSource::Control,
            format!("확인 대상 변경: {count}개"),
        );
        self.persist(move |config| config.monitor.endpoints = endpoints);
        Ok(count)
    }

    /// 수동 로그인 요청. 자동 로그인이 꺼져 있으면 `None`.
    pub fn request_login(&self) -> Option<DispatchResult> {
        let dispatcher = self.dispatcher.as_ref()?;
        Some(dispatcher.dispatch(LoginTrigger::Manual))
    }

    /// 진단 태스크 실행 (결과는 상태 이벤트로 보고)
    pub fn run_diagnostics(&self) {
        self.monitor.spawn_diagnostics();
    }

    pub fn connectivity(&self) -> ConnectivityState {
        self.monitor.state()
    }

    pub fn history(&self, limit: usize) -> Vec<StatusEvent> {
        self.status.recent(limit)
    }

    /// 사람이 읽는 현재 상태 요약
    pub fn summary(&self) -> Vec<String> {
        let control = self.monitor.control();
        let state = self.connectivity();
        let mut lines = Vec::new();

        lines.push(if control.is_running() {
            format!("모니터: 실행 중 (간격 {}초)", control.interval().as_secs())
        } else {
            "모니터: 중지".to_string()
        });

        let endpoints: Vec<String> = control.endpoints().iter().map(ToString::to_string).collect();
        lines.push(format!("확인 대상: {}", endpoints.join(", ")));

        let connection = self.monitor.connection_status();
        lines.push(match self.monitor.time_since_last_check() {
            Some(elapsed) if connection != ConnectionStatus::Unknown => format!(
                "연결: {connection} (연속 실패 {}회, {}초 전 확인)",
                state.consecutive_failures,
                elapsed.as_secs()
            ),
            _ => format!("연결: {connection}"),
        });

        lines.push(match &self.dispatcher {
            None => "자동 로그인: 비활성 (자격 증명 미설정)".to_string(),
            Some(dispatcher) => match dispatcher.last_outcome() {
                None if dispatcher.is_busy() => "로그인: 진행 중".to_string(),
                None => "로그인: 기록 없음".to_string(),
                Some(outcome) => format!(
                    "마지막 로그인: [{}] {}",
                    outcome.classification, outcome.diagnostic
                ),
            },
        });

        lines
    }

    fn persist(&self, change: impl FnOnce(&mut AppConfig)) {
        let Some(manager) = &self.config_manager else {
            return;
        };
        if let Err(e) = manager.update_with(change) {
            warn!("설정 저장 실패: {e}");
            self.status
                .warn(StatusSource::Control, format!("설정 저장 실패: {e}"));
        }
    }
}
