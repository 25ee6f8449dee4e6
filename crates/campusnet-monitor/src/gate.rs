//! 시작 시 연결 확인 단계.
//!
//! 첫 로그인 전에 네트워크가 올라올 때까지 선형 백오프로 확인한다.
//! 이 단계가 끝난 뒤(성공이든 소진이든)에야 첫 로그인이 나가고 모니터가 시작된다.

use campusnet_core::backoff::{BackoffScheduler, BackoffStep};
use campusnet_core::models::connectivity::ProbeTarget;
use campusnet_core::models::outcome::LoginOutcome;
use campusnet_core::models::status::StatusSource;
use campusnet_core::ports::probe::ConnectivityProbe;
use campusnet_core::ports::status_sink::StatusSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::dispatcher::{LoginDispatcher, LoginTrigger};

/// 연결 확인 단계 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// `attempts`번째 시도에서 연결 확인
    Connected { attempts: u32 },
    /// 최대 시도 횟수 소진
    Exhausted { attempts: u32 },
    /// 종료 신호로 중단
    Cancelled,
}

/// 시작 시 연결 확인 + 첫 로그인 결과
#[derive(Debug, Clone)]
pub struct InitialConnectReport {
    pub gate: GateOutcome,
    /// 연결 확인에 성공해 로그인을 보낸 경우의 결과
    pub login: Option<LoginOutcome>,
}

/// 첫 로그인 게이트
pub struct InitialConnect {
    probe: Arc<dyn ConnectivityProbe>,
    target: ProbeTarget,
    probe_timeout: Duration,
    scheduler: BackoffScheduler,
    status: Arc<dyn StatusSink>,
}

impl InitialConnect {
    pub fn new(
        probe: Arc<dyn ConnectivityProbe>,
        target: ProbeTarget,
        probe_timeout: Duration,
        scheduler: BackoffScheduler,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            probe,
            target,
            probe_timeout,
            scheduler,
            status,
        }
    }

    /// 네트워크 연결 대기
    pub async fn wait_for_network(&self, shutdown: &mut watch::Receiver<bool>) -> GateOutcome {
        let max = self.scheduler.max_attempts();
        info!(
            "시작 시 연결 확인: {} 최대 {max}회, 누적 대기 최대 {}초",
            self.target,
            self.scheduler.total_wait().as_secs()
        );

        for attempt in 1..=max {
            if *shutdown.borrow() {
                return GateOutcome::Cancelled;
            }

            self.status.info(
                StatusSource::InitialConnect,
                format!("네트워크 연결 확인 ({attempt}/{max})..."),
            );

            if self.probe.probe(&self.target, self.probe_timeout).await {
                self.status.info(
                    StatusSource::InitialConnect,
                    "네트워크 연결됨, 로그인 준비".to_string(),
                );
                return GateOutcome::Connected { attempts: attempt };
            }

            match self.scheduler.after_failure(attempt) {
                BackoffStep::Retry(delay) => {
                    self.status.warn(
                        StatusSource::InitialConnect,
                        format!("네트워크 미연결, {}초 후 재시도", delay.as_secs()),
                    );
                    if sleep_unless_shutdown(delay, shutdown).await {
                        return GateOutcome::Cancelled;
                    }
                }
                BackoffStep::Exhausted => break,
            }
        }

        self.status.error(
            StatusSource::InitialConnect,
            format!("{max}회 시도 후에도 네트워크에 연결할 수 없음, 로그인 건너뜀"),
        );
        GateOutcome::Exhausted { attempts: max }
    }

    /// 연결 확인 후 첫 로그인까지 수행
    ///
    /// 로그인은 디스패처를 거치므로 모니터가 보낸 로그인과 겹치지 않는다.
    pub async fn run(
        &self,
        dispatcher: &LoginDispatcher,
        shutdown: &mut watch::Receiver<bool>,
    ) -> InitialConnectReport {
        let gate = self.wait_for_network(shutdown).await;

        let login = match gate {
            GateOutcome::Connected { attempts } => {
                info!("연결 확인 완료 ({attempts}회), 첫 로그인 전송");
                let outcome = dispatcher.login_and_wait(LoginTrigger::Initial).await;
                if outcome.is_none() {
                    warn!("로그인 워커가 종료되어 첫 로그인 결과 없음");
                }
                outcome
            }
            GateOutcome::Exhausted { .. } | GateOutcome::Cancelled => None,
        };

        InitialConnectReport { gate, login }
    }
}

/// `delay`만큼 대기. 그 사이 종료 신호가 오면 `true`.
pub(crate) async fn sleep_unless_shutdown(
    delay: Duration,
    shutdown: &mut watch::Receiver<bool>,
) -> bool {
    let stop = async {
        if shutdown.wait_for(|stop| *stop).await.is_err() {
            // 송신자가 사라지면 종료 신호는 더 오지 않는다
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        _ = stop => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusHub;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use campusnet_core::models::connectivity::ProbeReport;
    use campusnet_core::models::status::StatusLevel;
    use parking_lot::Mutex;
    use tokio::time::Instant;

    /// 미리 정한 결과를 순서대로 돌려주는 프로브. 호출 시각도 기록한다.
    struct ScriptedProbe {
        results: Mutex<Vec<bool>>,
        calls: Mutex<Vec<Instant>>,
    }

    impl ScriptedProbe {
        fn new(results: Vec<bool>) -> Arc<Self> {
            Arc::new(Self {
                results: Mutex::new(results.into_iter().rev().collect()),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ConnectivityProbe for ScriptedProbe {
        async fn probe(&self, _target: &ProbeTarget, _timeout: Duration) -> bool {
            self.calls.lock().push(Instant::now());
            self.results.lock().pop().unwrap_or(false)
        }

        async fn probe_latency(&self, target: &ProbeTarget, _timeout: Duration) -> ProbeReport {
            ProbeReport {
                target: target.clone(),
                latency: None,
                error: None,
            }
        }
    }

    fn gate(probe: Arc<ScriptedProbe>, hub: Arc<StatusHub>, max: u32) -> InitialConnect {
        InitialConnect::new(
            probe,
            ProbeTarget::new("8.8.8.8", 53),
            Duration::from_secs(2),
            BackoffScheduler::new(Duration::from_secs(5), max),
            hub,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn connects_after_linear_waits() {
        let probe = ScriptedProbe::new(vec![false, false, true]);
        let hub = Arc::new(StatusHub::default());
        let (_tx, mut rx) = watch::channel(false);

        let outcome = gate(probe.clone(), hub.clone(), 12).wait_for_network(&mut rx).await;
        assert_eq!(outcome, GateOutcome::Connected { attempts: 3 });

        let calls = probe.calls.lock().clone();
        assert_eq!(calls[1] - calls[0], Duration::from_secs(5));
        assert_eq!(calls[2] - calls[1], Duration::from_secs(10));

        let waits: Vec<_> = hub
            .recent(50)
            .into_iter()
            .filter(|e| e.level == StatusLevel::Warn)
            .map(|e| e.message)
            .collect();
        assert_eq!(waits.len(), 2);
        assert!(waits[0].contains("5초"));
        assert!(waits[1].contains("10초"));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_without_trailing_wait() {
        let probe = ScriptedProbe::new(vec![]);
        let hub = Arc::new(StatusHub::default());
        let (_tx, mut rx) = watch::channel(false);

        let started = Instant::now();
        let outcome = gate(probe.clone(), hub.clone(), 3).wait_for_network(&mut rx).await;

        assert_eq!(outcome, GateOutcome::Exhausted { attempts: 3 });
        assert_eq!(probe.calls.lock().len(), 3);
        // 5 + 10, 마지막 실패 뒤에는 대기하지 않는다
        assert_eq!(started.elapsed(), Duration::from_secs(15));
        assert_matches!(hub.recent(1)[0].level, StatusLevel::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_backoff_sleep() {
        let probe = ScriptedProbe::new(vec![]);
        let hub = Arc::new(StatusHub::default());
        let (tx, mut rx) = watch::channel(false);

        let task = tokio::spawn({
            let gate = gate(probe.clone(), hub, 12);
            async move { gate.wait_for_network(&mut rx).await }
        });
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();

        assert_eq!(task.await.unwrap(), GateOutcome::Cancelled);
        assert_eq!(probe.calls.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_shutdown_sender_still_sleeps() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);

        let started = Instant::now();
        assert!(!sleep_unless_shutdown(Duration::from_secs(7), &mut rx).await);
        assert_eq!(started.elapsed(), Duration::from_secs(7));
    }
}
