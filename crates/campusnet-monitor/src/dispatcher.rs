//! 로그인 직렬화 지점.
//!
//! 모든 코어 로그인 요청(시작 시, 모니터, 수동)은 단일 슬롯 큐를 거쳐
//! 하나의 워커 태스크가 순서대로 처리한다. 동시에 진행 중인 로그인은 최대 1개다.

use campusnet_core::models::credentials::Credentials;
use campusnet_core::models::outcome::LoginOutcome;
use campusnet_core::models::status::StatusSource;
use campusnet_core::ports::login_client::LoginClient;
use campusnet_core::ports::status_sink::StatusSink;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info};

/// 로그인 요청 사유
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginTrigger {
    /// 시작 시 연결 확인 후
    Initial,
    /// 모니터가 연결 끊김 감지
    ConnectivityLost,
    /// 제어면 요청
    Manual,
}

impl std::fmt::Display for LoginTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginTrigger::Initial => write!(f, "시작"),
            LoginTrigger::ConnectivityLost => write!(f, "연결 끊김"),
            LoginTrigger::Manual => write!(f, "수동"),
        }
    }
}

/// 요청 접수 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchResult {
    /// 큐에 등록됨
    Queued,
    /// 이미 대기 중인 요청이 있어 합쳐짐
    Coalesced,
    /// 워커 종료됨
    Closed,
}

struct LoginRequest {
    trigger: LoginTrigger,
    reply: Option<oneshot::Sender<LoginOutcome>>,
}

/// 로그인 요청 핸들 (복제 가능)
#[derive(Clone)]
pub struct LoginDispatcher {
    tx: mpsc::Sender<LoginRequest>,
    outcome_rx: watch::Receiver<Option<LoginOutcome>>,
    in_flight: Arc<AtomicBool>,
}

impl LoginDispatcher {
    /// 워커 태스크를 띄우고 핸들 반환. 모든 핸들이 drop되면 워커도 종료된다.
    pub fn spawn(
        client: Arc<dyn LoginClient>,
        credentials: Arc<Credentials>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let in_flight = Arc::new(AtomicBool::new(false));

        tokio::spawn(run_worker(
            rx,
            client,
            credentials,
            status,
            outcome_tx,
            in_flight.clone(),
        ));

        Self {
            tx,
            outcome_rx,
            in_flight,
        }
    }

    /// 결과를 기다리지 않고 요청. 슬롯이 차 있으면 합친다.
    pub fn dispatch(&self, trigger: LoginTrigger) -> DispatchResult {
        let request = LoginRequest {
            trigger,
            reply: None,
        };
        match self.tx.try_send(request) {
            Ok(()) => {
                debug!("로그인 요청 등록: {trigger}");
                DispatchResult::Queued
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("대기 중인 로그인 요청 있음, 합침: {trigger}");
                DispatchResult::Coalesced
            }
            Err(mpsc::error::TrySendError::Closed(_)) => DispatchResult::Closed,
        }
    }

    /// 요청 후 결과 대기. 슬롯이 비기를 기다린다. 워커가 종료됐으면 `None`.
    pub async fn login_and_wait(&self, trigger: LoginTrigger) -> Option<LoginOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let request = LoginRequest {
            trigger,
            reply: Some(reply_tx),
        };
        self.tx.send(request).await.ok()?;
        reply_rx.await.ok()
    }

    /// 로그인 진행 중 여부
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// 마지막 로그인 결과
    pub fn last_outcome(&self) -> Option<LoginOutcome> {
        self.outcome_rx.borrow().clone()
    }

    /// 로그인 결과 구독
    pub fn subscribe(&self) -> watch::Receiver<Option<LoginOutcome>> {
        self.outcome_rx.clone()
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<LoginRequest>,
    client: Arc<dyn LoginClient>,
    credentials: Arc<Credentials>,
    status: Arc<dyn StatusSink>,
    outcome_tx: watch::Sender<Option<LoginOutcome>>,
    in_flight: Arc<AtomicBool>,
) {
    while let Some(request) = rx.recv().await {
        in_flight.store(true, Ordering::Release);
        status.info(
            StatusSource::Login,
            format!("로그인 요청 전송 ({}): {}", request.trigger, credentials.account_id()),
        );

        let attempt = AssertUnwindSafe(client.login(&credentials)).catch_unwind().await;
        in_flight.store(false, Ordering::Release);

        let outcome = match attempt {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("로그인 처리 중 패닉 발생");
                status.error(StatusSource::Login, "로그인 처리 중 예기치 않은 오류".to_string());
                continue;
            }
        };

        report(status.as_ref(), &outcome);
        outcome_tx.send_replace(Some(outcome.clone()));
        if let Some(reply) = request.reply {
            let _ = reply.send(outcome);
        }
    }
    info!("로그인 워커 종료");
}

fn report(status: &dyn StatusSink, outcome: &LoginOutcome) {
    if outcome.is_success() {
        status.info(StatusSource::Login, outcome.diagnostic.clone());
        if outcome.account_consistent == Some(false) {
            status.warn(
                StatusSource::Login,
                "응답 계정이 제출한 계정과 다름 (로그인은 성공으로 처리)".to_string(),
            );
        }
    } else if outcome.classification.is_transient() {
        // 네트워크 실패는 다음 모니터 주기에 다시 시도된다
        status.warn(
            StatusSource::Login,
            format!("로그인 실패 [{}]: {}", outcome.classification, outcome.diagnostic),
        );
    } else {
        status.error(
            StatusSource::Login,
            format!("로그인 실패 [{}]: {}", outcome.classification, outcome.diagnostic),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusHub;
    use async_trait::async_trait;
    use campusnet_core::models::credentials::ServiceProvider;
    use campusnet_core::models::outcome::{LoginClassification, UserIndex};
    use campusnet_core::models::status::StatusLevel;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// 호출 수와 동시 실행 수를 세는 클라이언트. `gate`가 열릴 때까지 응답을 붙잡는다.
    struct GatedClient {
        calls: AtomicUsize,
        concurrent: AtomicUsize,
        max_concurrent: AtomicUsize,
        gate: Notify,
    }

    impl GatedClient {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                concurrent: AtomicUsize::new(0),
                max_concurrent: AtomicUsize::new(0),
                gate: Notify::new(),
            })
        }
    }

    #[async_trait]
    impl LoginClient for GatedClient {
        async fn login(&self, credentials: &Credentials) -> LoginOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_concurrent.fetch_max(now, Ordering::SeqCst);
            self.gate.notified().await;
            self.concurrent.fetch_sub(1, Ordering::SeqCst);
            LoginOutcome::success(
                200,
                String::new(),
                UserIndex {
                    device_id: "devA".to_string(),
                    assigned_ip: "10.0.0.5".to_string(),
                    account_echo: "stu123".to_string(),
                },
                credentials.account_id(),
            )
        }
    }

    fn credentials() -> Arc<Credentials> {
        Arc::new(Credentials::new(
            "stu123",
            "enc",
            ServiceProvider::Cmcc,
            "q",
            "http://portal/login",
        ))
    }

    async fn wait_until(cond: impl Fn() -> bool) {
        for _ in 0..200 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("조건이 충족되지 않음");
    }

    #[tokio::test]
    async fn requests_are_serialized_and_coalesced() {
        let client = GatedClient::new();
        let hub = Arc::new(StatusHub::default());
        let dispatcher = LoginDispatcher::spawn(client.clone(), credentials(), hub);

        assert_eq!(dispatcher.dispatch(LoginTrigger::Initial), DispatchResult::Queued);
        wait_until(|| dispatcher.is_busy()).await;

        // 첫 요청 처리 중: 슬롯 하나만 비어 있음
        assert_eq!(
            dispatcher.dispatch(LoginTrigger::ConnectivityLost),
            DispatchResult::Queued
        );
        assert_eq!(
            dispatcher.dispatch(LoginTrigger::ConnectivityLost),
            DispatchResult::Coalesced
        );

        client.gate.notify_one();
        wait_until(|| client.calls.load(Ordering::SeqCst) == 2).await;
        client.gate.notify_one();
        wait_until(|| !dispatcher.is_busy() && dispatcher.last_outcome().is_some()).await;

        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        assert_eq!(client.max_concurrent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn login_and_wait_returns_outcome() {
        let client = GatedClient::new();
        let hub = Arc::new(StatusHub::default());
        let dispatcher = LoginDispatcher::spawn(client.clone(), credentials(), hub.clone());

        let waiter = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.login_and_wait(LoginTrigger::Manual).await })
        };
        wait_until(|| dispatcher.is_busy()).await;
        client.gate.notify_one();

        let outcome = waiter.await.unwrap().unwrap();
        assert_eq!(outcome.classification, LoginClassification::Success);
        assert!(dispatcher.last_outcome().unwrap().is_success());
        assert!(hub
            .recent(10)
            .iter()
            .any(|e| e.source == StatusSource::Login && e.message.contains("로그인 성공")));
    }

    /// 정해진 분류의 실패를 즉시 돌려주는 클라이언트
    struct FailingClient(LoginClassification);

    #[async_trait]
    impl LoginClient for FailingClient {
        async fn login(&self, _credentials: &Credentials) -> LoginOutcome {
            LoginOutcome::failure(self.0, None, String::new(), "실패")
        }
    }

    #[tokio::test]
    async fn transient_failures_are_warnings() {
        for (classification, level) in [
            (LoginClassification::NetworkError, StatusLevel::Warn),
            (LoginClassification::MissingField, StatusLevel::Error),
        ] {
            let hub = Arc::new(StatusHub::default());
            let dispatcher =
                LoginDispatcher::spawn(Arc::new(FailingClient(classification)), credentials(), hub.clone());

            let outcome = dispatcher.login_and_wait(LoginTrigger::Manual).await.unwrap();
            assert_eq!(outcome.classification, classification);

            let last = hub.recent(1).pop().unwrap();
            assert_eq!(last.level, level);
            assert!(last.message.contains(classification.as_str()));
        }
    }

    struct PanickingClient;

    #[async_trait]
    impl LoginClient for PanickingClient {
        async fn login(&self, _credentials: &Credentials) -> LoginOutcome {
            panic!("boom");
        }
    }

    #[tokio::test]
    async fn worker_survives_panicking_client() {
        let hub = Arc::new(StatusHub::default());
        let dispatcher = LoginDispatcher::spawn(Arc::new(PanickingClient), credentials(), hub.clone());

        // 응답 송신자가 drop되어 None
        assert!(dispatcher.login_and_wait(LoginTrigger::Manual).await.is_none());
        // 워커는 살아 있어 다음 요청도 받는다
        assert_eq!(dispatcher.dispatch(LoginTrigger::Manual), DispatchResult::Queued);
        assert!(hub.recent(10).iter().any(|e| e.message.contains("예기치 않은")));
    }
}
