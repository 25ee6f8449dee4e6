//! 로깅 초기화.
//!
//! 콘솔 레이어 + 영구 로그 파일 레이어(`campusnet.log`, 회전 없음).
//! 상태 이벤트는 콘솔 출력기가 따로 표시하므로 콘솔 레이어에서는 제외한다.

use anyhow::Result;
use campusnet_monitor::status::STATUS_LOG_TARGET;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// 영구 로그 파일 이름
pub const LOG_FILE_NAME: &str = "campusnet.log";

/// 로그 디렉토리 결정 (CLI 인자 또는 플랫폼별 기본 경로)
///
/// - Linux: `~/.local/share/campusnet/logs`
/// - macOS: `~/Library/Application Support/campusnet/logs`
/// - Windows: `%APPDATA%\campusnet\data\logs`
pub fn resolve_log_dir(log_dir: Option<&Path>) -> PathBuf {
    log_dir
        .map(Path::to_path_buf)
        .or_else(|| ProjectDirs::from("", "", "campusnet").map(|p| p.data_dir().join("logs")))
        .unwrap_or_else(|| PathBuf::from("./logs"))
}

/// 기본 필터. 상태 이벤트는 로그 레벨과 무관하게 항상 기록한다.
pub fn default_filter(log_level: &str) -> String {
    format!("campusnet={log_level},{STATUS_LOG_TARGET}=info")
}

/// 로깅 초기화. 반환된 guard가 drop되면 파일 기록이 중단된다.
pub fn init(log_level: &str, log_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::never(log_dir, LOG_FILE_NAME);
    let (file_writer, guard) = non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(filter_fn(|meta| meta.target() != STATUS_LOG_TARGET));

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(log_level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()?;

    info!("로깅 초기화: 레벨: {log_level}, 파일: {}", log_dir.join(LOG_FILE_NAME).display());
    Ok(guard)
}
