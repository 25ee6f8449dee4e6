//! # campusnet-app
//!
//! campusnet 에이전트 바이너리 진입점.
//! 설정 로드, 로깅 초기화, 어댑터 와이어링, 시작 시 연결 확인, 모니터, 콘솔 제어면.

mod app;
mod console;
mod lifecycle;
mod logging;

use anyhow::{bail, Context, Result};
use campusnet_core::config::{validate_interval, AppConfig};
use campusnet_core::config_manager::ConfigManager;
use campusnet_core::models::connectivity::parse_target_list;
use campusnet_core::models::credentials::ServiceProvider;
use campusnet_monitor::gate::GateOutcome;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::app::CampusNet;
use crate::lifecycle::LifecycleManager;

/// campusnet 캡티브 포털 자동 로그인 에이전트
///
/// 시작 시 네트워크 연결을 확인해 ePortal에 로그인하고, 이후 연결을 주기적으로 감시해
/// 끊기면 다시 로그인한다.
#[derive(Parser, Debug)]
#[command(name = "campusnet")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 설정 파일 경로 (기본: 플랫폼별 설정 디렉토리의 config.json)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// 모니터 간격 (초, 최소 10)
    #[arg(long, short = 'i')]
    interval: Option<u64>,

    /// 확인 대상 (host:port, 쉼표 구분 또는 반복 지정)
    #[arg(long, short = 'e')]
    endpoint: Vec<String>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 로그 디렉토리 (기본: 플랫폼별 데이터 디렉토리)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// 시작 시 연결 확인 + 로그인만 수행하고 종료
    #[arg(long, conflicts_with = "ping")]
    once: bool,

    /// 전체 확인 대상 진단만 수행하고 종료
    #[arg(long)]
    ping: bool,

    /// 설정 파일을 삭제해 기본값으로 되돌리고 종료
    #[arg(long, conflicts_with_all = ["once", "ping"])]
    reset_config: bool,

    /// 저장할 계정 (자격 증명 인자는 기존 값과 합쳐 검증 후 저장)
    #[arg(long)]
    account: Option<String>,

    /// 저장할 암호화 비밀번호 blob
    #[arg(long)]
    password_blob: Option<String>,

    /// 저장할 서비스 제공자 (cmcc, telecom)
    #[arg(long)]
    service: Option<ServiceProvider>,

    /// 저장할 네트워크 파라미터 (포털 리다이렉트 쿼리 문자열)
    #[arg(long)]
    network_params: Option<String>,

    /// 저장할 로그인 엔드포인트 URL
    #[arg(long)]
    portal_url: Option<String>,
}

impl Args {
    fn has_credential_args(&self) -> bool {
        self.account.is_some()
            || self.password_blob.is_some()
            || self.service.is_some()
            || self.network_params.is_some()
            || self.portal_url.is_some()
    }
}

/// CLI 인자로 설정 오버라이드
fn apply_overrides(mut config: AppConfig, args: &Args) -> Result<AppConfig> {
    if let Some(secs) = args.interval {
        validate_interval(secs)?;
        config.monitor.interval_secs = secs;
    }
    if !args.endpoint.is_empty() {
        config.monitor.endpoints = parse_target_list(&args.endpoint.join(","))?;
    }
    config.validate().context("설정값 검증 실패")?;
    Ok(config)
}

/// CLI로 받은 자격 증명을 기존 값과 합쳐 저장. 저장했으면 `true`.
fn save_credential_args(manager: &ConfigManager, args: &Args) -> Result<bool> {
    if !args.has_credential_args() {
        return Ok(false);
    }

    let mut credentials = manager.get().credentials;
    if let Some(account) = &args.account {
        credentials.user_account = account.clone();
    }
    if let Some(blob) = &args.password_blob {
        credentials.encrypted_password = blob.clone();
    }
    if let Some(service) = args.service {
        credentials.service = service;
    }
    if let Some(params) = &args.network_params {
        credentials.network_params = params.clone();
    }
    if let Some(url) = &args.portal_url {
        credentials.target_url = url.clone();
    }

    if let Err(e) = manager.save_credentials(credentials) {
        if e.is_config_error() {
            bail!("자격 증명 저장 거부: {e} (필수 항목을 모두 지정해야 함)");
        }
        return Err(e.into());
    }
    Ok(true)
}

fn load_config_manager(path: Option<PathBuf>) -> Result<ConfigManager> {
    let manager = match path {
        Some(path) => ConfigManager::with_path(path)?,
        None => ConfigManager::new()?,
    };
    Ok(manager)
}

/// 배너 출력
fn print_banner(config: &AppConfig, auto_login: bool) {
    println!();
    println!("┌──────────────────────────────────────────────┐");
    println!("│  campusnet · ePortal 자동 로그인 에이전트    │");
    println!("└──────────────────────────────────────────────┘");
    println!("  포털: {}", config.credentials.target_url);
    println!(
        "  모니터: {}초 간격, 대상 {}개",
        config.monitor.interval_secs,
        config.monitor.endpoints.len()
    );
    if !auto_login {
        println!("  자동 로그인: 비활성 (설정 파일에 자격 증명을 입력하세요)");
    }
    println!("  명령 목록: help");
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_dir = logging::resolve_log_dir(args.log_dir.as_deref());
    let _log_guard = logging::init(&args.log_level, &log_dir)?;

    let config_manager = load_config_manager(args.config.clone())?;
    info!("설정 파일: {}", config_manager.config_path().display());

    if args.reset_config {
        config_manager.reset()?;
        println!("설정 초기화 완료: {}", config_manager.config_path().display());
        return Ok(());
    }
    if save_credential_args(&config_manager, &args)? {
        println!("자격 증명 저장 완료");
    }
    let config = apply_overrides(config_manager.get(), &args)?;

    let app = Arc::new(CampusNet::build(&config, Some(config_manager))?);
    let lifecycle = Arc::new(LifecycleManager::new());

    // 진단 모드
    if args.ping {
        let reports = app.monitor().diagnose().await;
        for report in &reports {
            println!("{report}");
        }
        return Ok(());
    }

    tokio::spawn(console::print_status_events(
        app.status_hub().subscribe(),
        lifecycle.subscribe(),
    ));

    // 단발 모드
    if args.once {
        let mut shutdown = lifecycle.subscribe();
        let startup = {
            let app = app.clone();
            async move { app.initial_connect(&mut shutdown).await }
        };
        let report = tokio::select! {
            report = startup => report,
            _ = lifecycle.wait_for_signal() => return Ok(()),
        };
        let logged_in = report.login.as_ref().is_some_and(|o| o.is_success());
        match report.gate {
            GateOutcome::Connected { .. } if logged_in => return Ok(()),
            GateOutcome::Connected { .. } => bail!("로그인 실패"),
            GateOutcome::Exhausted { attempts } => {
                bail!("{attempts}회 시도 후에도 네트워크에 연결할 수 없음")
            }
            GateOutcome::Cancelled => return Ok(()),
        }
    }

    print_banner(&config, app.auto_login_enabled());
    info!("campusnet 에이전트 시작 (Ctrl+C 또는 quit으로 종료)");

    // 시작 시 연결 확인 + 첫 로그인 → 모니터 시작
    {
        let app = app.clone();
        let mut shutdown = lifecycle.subscribe();
        tokio::spawn(async move {
            app.run_startup(&mut shutdown).await;
        });
    }

    tokio::spawn(console::run(app.clone(), lifecycle.clone()));

    lifecycle.wait_for_shutdown().await;
    app.stop_monitor();

    info!("campusnet 에이전트 종료");
    Ok(())
}
