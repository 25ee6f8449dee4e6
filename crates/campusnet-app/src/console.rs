//! 콘솔 제어면.
//!
//! 표준 입력에서 한 줄 명령을 읽어 실행하고, 상태 이벤트를 표준 출력에 흘려보낸다.
//! 네트워크 작업은 모두 백그라운드 태스크로 넘기므로 명령 처리는 막히지 않는다.

use anyhow::{anyhow, bail, Result};
use campusnet_monitor::dispatcher::DispatchResult;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use campusnet_core::models::status::StatusEvent;

use crate::app::CampusNet;
use crate::lifecycle::LifecycleManager;

/// `history` 기본 표시 개수
const DEFAULT_HISTORY_LIMIT: usize = 20;

const HELP: &[&str] = &[
    "status                       현재 상태",
    "start | stop                 모니터 시작/중지",
    "interval <초>                모니터 간격 변경 (최소 10)",
    "endpoints <host:port,...>    확인 대상 변경",
    "ping                         전체 대상 진단",
    "login                        즉시 로그인",
    "history [개수]               최근 상태 이벤트",
    "quit                         종료",
];

/// 콘솔 명령
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Status,
    Start,
    Stop,
    Interval(u64),
    Endpoints(String),
    Ping,
    Login,
    History(usize),
    Help,
    Quit,
}

impl FromStr for ConsoleCommand {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name.to_ascii_lowercase().as_str() {
            "status" => ConsoleCommand::Status,
            "start" => ConsoleCommand::Start,
            "stop" => ConsoleCommand::Stop,
            "interval" => {
                let secs = rest
                    .parse()
                    .map_err(|_| anyhow!("간격은 초 단위 정수여야 함: '{rest}'"))?;
                ConsoleCommand::Interval(secs)
            }
            "endpoints" => {
                if rest.is_empty() {
                    bail!("확인 대상을 입력해야 함 (예: endpoints qq.com:80,www.baidu.com)");
                }
                ConsoleCommand::Endpoints(rest.to_string())
            }
            "ping" => ConsoleCommand::Ping,
            "login" => ConsoleCommand::Login,
            "history" => {
                let limit = if rest.is_empty() {
                    DEFAULT_HISTORY_LIMIT
                } else {
                    rest.parse()
                        .map_err(|_| anyhow!("개수는 정수여야 함: '{rest}'"))?
                };
                ConsoleCommand::History(limit)
            }
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" => ConsoleCommand::Quit,
            other => bail!("알 수 없는 명령: '{other}' (help로 목록 확인)"),
        };
        Ok(command)
    }
}

/// 명령 실행 후 출력할 줄 반환
pub fn execute(app: &CampusNet, lifecycle: &LifecycleManager, command: ConsoleCommand) -> Vec<String> {
    match command {
        ConsoleCommand::Status => app.summary(),
        ConsoleCommand::Start => match app.start_monitor() {
            Ok(true) => vec!["모니터 시작".to_string()],
            Ok(false) => vec!["모니터가 이미 실행 중".to_string()],
            Err(e) => vec![e.to_string()],
        },
        ConsoleCommand::Stop => {
            if app.stop_monitor() {
                vec!["모니터 중지".to_string()]
            } else {
                vec!["모니터가 이미 중지됨".to_string()]
            }
        }
        ConsoleCommand::Interval(secs) => match app.set_interval(secs) {
            Ok(_) => vec![format!("모니터 간격: {secs}초")],
            Err(e) => vec![format!("간격 변경 거부: {e}")],
        },
        ConsoleCommand::Endpoints(input) => match app.set_endpoints(&input) {
            Ok(count) => vec![format!("확인 대상 {count}개로 변경")],
            Err(e) => vec![format!("확인 대상 변경 거부: {e}")],
        },
        ConsoleCommand::Ping => {
            app.run_diagnostics();
            vec!["진단 시작".to_string()]
        }
        ConsoleCommand::Login => match app.request_login() {
            None => vec!["자격 증명이 없어 로그인할 수 없음".to_string()],
            Some(DispatchResult::Queued) => vec!["로그인 요청".to_string()],
            Some(DispatchResult::Coalesced) => vec!["이미 대기 중인 로그인 요청이 있음".to_string()],
            Some(DispatchResult::Closed) => vec!["로그인 워커가 종료됨".to_string()],
        },
        ConsoleCommand::History(limit) => {
            let events = app.history(limit);
            if events.is_empty() {
                vec!["기록 없음".to_string()]
            } else {
                events.iter().map(ToString::to_string).collect()
            }
        }
        ConsoleCommand::Help => HELP.iter().map(|line| line.to_string()).collect(),
        ConsoleCommand::Quit => {
            lifecycle.shutdown();
            vec!["종료 중...".to_string()]
        }
    }
}

/// 표준 입력 명령 루프. 입력이 닫히면 명령 처리만 멈추고 에이전트는 계속 동작한다.
pub async fn run(app: Arc<CampusNet>, lifecycle: Arc<LifecycleManager>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut shutdown = lifecycle.subscribe();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = shutdown.wait_for(|stop| *stop) => break,
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("표준 입력 종료, 콘솔 명령 비활성");
                break;
            }
            Err(e) => {
                warn!("표준 입력 읽기 실패: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<ConsoleCommand>() {
            Ok(command) => {
                for output in execute(&app, &lifecycle, command) {
                    println!("{output}");
                }
            }
            Err(e) => println!("{e}"),
        }
    }
}

/// 상태 이벤트를 표준 출력에 표시
pub async fn print_status_events(
    mut events: broadcast::Receiver<StatusEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = shutdown.wait_for(|stop| *stop) => break,
        };

        match event {
            Ok(event) => println!("{event}"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                println!("(상태 이벤트 {skipped}개 생략)");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
