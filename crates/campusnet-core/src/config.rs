//! 애플리케이션 설정 구조체.
//!
//! 자격 증명, 로그인 요청, 시작 시 연결 확인(게이트), 모니터, 상태 이력 설정을 정의한다.
//! [`ConfigManager`](crate::config_manager::ConfigManager)가 JSON 파일로 저장/로드한다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::backoff::BackoffScheduler;
use crate::error::CoreError;
use crate::models::connectivity::ProbeTarget;
use crate::models::credentials::{Credentials, ServiceProvider};

/// 모니터 간격 하한 (초)
pub const MIN_MONITOR_INTERVAL_SECS: u64 = 10;

/// 포털 로그인 엔드포인트 기본값
pub const DEFAULT_TARGET_URL: &str = "http://172.17.10.100/eportal/InterFace.do?method=login";

/// 포털이 비브라우저 클라이언트를 거부하므로 브라우저 UA를 고정 사용
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36";

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 로그인 자격 증명
    #[serde(default)]
    pub credentials: CredentialsConfig,
    /// 로그인 요청 설정
    #[serde(default)]
    pub login: LoginConfig,
    /// 시작 시 연결 확인 설정
    #[serde(default)]
    pub gate: GateConfig,
    /// 주기적 연결 모니터 설정
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// 상태 이벤트 이력 설정
    #[serde(default)]
    pub status: StatusConfig,
}

// ============================================================
// 자격 증명
// ============================================================

/// 저장된 자격 증명. 빈 문자열은 "미설정"으로 본다
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub user_account: String,
    /// 브라우저 측에서 암호화된 비밀번호 blob
    #[serde(default)]
    pub encrypted_password: String,
    #[serde(default)]
    pub service: ServiceProvider,
    /// 포털 리다이렉트 URL의 쿼리 문자열
    #[serde(default)]
    pub network_params: String,
    #[serde(default = "default_target_url")]
    pub target_url: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            user_account: String::new(),
            encrypted_password: String::new(),
            service: ServiceProvider::default(),
            network_params: String::new(),
            target_url: default_target_url(),
        }
    }
}

impl CredentialsConfig {
    /// 비어 있는 필수 필드 목록
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.user_account.trim().is_empty() {
            missing.push("user_account");
        }
        if self.encrypted_password.trim().is_empty() {
            missing.push("encrypted_password");
        }
        if self.network_params.trim().is_empty() {
            missing.push("network_params");
        }
        if self.target_url.trim().is_empty() {
            missing.push("target_url");
        }
        missing
    }

    /// 검증 후 불변 [`Credentials`] 생성
    pub fn to_credentials(&self) -> Result<Credentials, CoreError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(CoreError::ConfigIncomplete { missing });
        }

        let target_url = self.target_url.trim();
        url::Url::parse(target_url).map_err(|e| CoreError::InvalidSetting {
            field: "target_url",
            message: format!("{target_url}: {e}"),
        })?;

        Ok(Credentials::new(
            self.user_account.trim(),
            self.encrypted_password.trim(),
            self.service,
            self.network_params.trim(),
            target_url,
        ))
    }
}

// ============================================================
// 로그인 요청
// ============================================================

/// 로그인 요청 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginConfig {
    /// 요청 타임아웃 (초)
    #[serde(default = "default_login_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_login_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

// ============================================================
// 시작 시 연결 확인
// ============================================================

/// 첫 로그인 전 연결 확인 + 선형 백오프 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// 확인 대상 (기본: 공용 DNS)
    #[serde(default = "default_gate_target")]
    pub target: ProbeTarget,
    #[serde(default = "default_gate_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    #[serde(default = "default_gate_max_attempts")]
    pub max_attempts: u32,
    /// 백오프 기준 지연 (초). n번째 실패 후 `base * n` 대기
    #[serde(default = "default_gate_base_delay_secs")]
    pub base_delay_secs: u64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            target: default_gate_target(),
            probe_timeout_ms: default_gate_probe_timeout_ms(),
            max_attempts: default_gate_max_attempts(),
            base_delay_secs: default_gate_base_delay_secs(),
        }
    }
}

impl GateConfig {
    pub fn scheduler(&self) -> BackoffScheduler {
        BackoffScheduler::new(Duration::from_secs(self.base_delay_secs), self.max_attempts)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

// ============================================================
// 모니터
// ============================================================

/// 주기적 연결 모니터 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// 시작 시 모니터 자동 실행
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 확인 주기 (초, 최소 10)
    #[serde(default = "default_monitor_interval_secs")]
    pub interval_secs: u64,
    /// 순서대로 확인할 엔드포인트
    #[serde(default = "default_monitor_endpoints")]
    pub endpoints: Vec<ProbeTarget>,
    #[serde(default = "default_monitor_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_monitor_interval_secs(),
            endpoints: default_monitor_endpoints(),
            probe_timeout_ms: default_monitor_probe_timeout_ms(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

/// 모니터 간격 검증. 하한 미달은 보정하지 않고 거부한다
pub fn validate_interval(secs: u64) -> Result<Duration, CoreError> {
    if secs < MIN_MONITOR_INTERVAL_SECS {
        return Err(CoreError::InvalidSetting {
            field: "interval",
            message: format!("모니터 간격은 {MIN_MONITOR_INTERVAL_SECS}초 이상이어야 함 (입력: {secs}초)"),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// 엔드포인트 목록 검증. 빈 목록 거부
pub fn validate_endpoints(endpoints: &[ProbeTarget]) -> Result<(), CoreError> {
    if endpoints.is_empty() {
        return Err(CoreError::InvalidSetting {
            field: "endpoints",
            message: "확인 대상 목록이 비어 있음".to_string(),
        });
    }
    Ok(())
}

// ============================================================
// 상태 이벤트
// ============================================================

/// 상태 이벤트 이력/구독 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusConfig {
    /// 메모리에 유지할 최근 이벤트 수
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// 실시간 구독 채널 용량
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self::default()
    }

    /// 로그인 요청 타임아웃
    pub fn login_timeout(&self) -> Duration {
        Duration::from_secs(self.login.timeout_secs)
    }

    /// 런타임 설정 검증 (자격 증명 제외. 누락 시에도 기동은 계속된다)
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_interval(self.monitor.interval_secs)?;
        validate_endpoints(&self.monitor.endpoints)?;
        if self.login.timeout_secs == 0 {
            return Err(CoreError::InvalidSetting {
                field: "login.timeout_secs",
                message: "0보다 커야 함".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_target_url() -> String {
    DEFAULT_TARGET_URL.to_string()
}

fn default_login_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_gate_target() -> ProbeTarget {
    ProbeTarget::new("8.8.8.8", 53)
}

fn default_gate_probe_timeout_ms() -> u64 {
    2_000
}

fn default_gate_max_attempts() -> u32 {
    12
}

fn default_gate_base_delay_secs() -> u64 {
    5
}

fn default_monitor_interval_secs() -> u64 {
    60
}

fn default_monitor_endpoints() -> Vec<ProbeTarget> {
    vec![
        ProbeTarget::new("www.baidu.com", 80),
        ProbeTarget::new("qq.com", 80),
        ProbeTarget::new("www.taobao.com", 80),
    ]
}

fn default_monitor_probe_timeout_ms() -> u64 {
    5_000
}

fn default_history_capacity() -> usize {
    500
}

fn default_broadcast_capacity() -> usize {
    256
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn filled() -> CredentialsConfig {
        CredentialsConfig {
            user_account: "stu123".to_string(),
            encrypted_password: "enc".to_string(),
            service: ServiceProvider::Telecom,
            network_params: "wlanuserip=10.0.0.5".to_string(),
            target_url: DEFAULT_TARGET_URL.to_string(),
        }
    }

    #[test]
    fn defaults_match_portal_deployment() {
        let config = AppConfig::default_config();
        assert_eq!(config.login.timeout_secs, 30);
        assert_eq!(config.gate.max_attempts, 12);
        assert_eq!(config.gate.base_delay_secs, 5);
        assert_eq!(config.gate.target.to_string(), "8.8.8.8:53");
        assert_eq!(config.monitor.interval_secs, 60);
        assert_eq!(config.monitor.endpoints.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_credentials_are_incomplete() {
        let err = CredentialsConfig::default().to_credentials().unwrap_err();
        assert_matches!(err, CoreError::ConfigIncomplete { ref missing } if missing.len() == 3);
    }

    #[test]
    fn credentials_trimmed_and_built() {
        let mut cfg = filled();
        cfg.user_account = "  stu123 ".to_string();
        let creds = cfg.to_credentials().unwrap();
        assert_eq!(creds.account_id(), "stu123");
        assert_eq!(creds.service(), ServiceProvider::Telecom);
    }

    #[test]
    fn invalid_target_url_rejected() {
        let mut cfg = filled();
        cfg.target_url = "not a url".to_string();
        assert_matches!(
            cfg.to_credentials(),
            Err(CoreError::InvalidSetting { field: "target_url", .. })
        );
    }

    #[test]
    fn interval_boundary() {
        assert_eq!(validate_interval(10).unwrap(), Duration::from_secs(10));
        let err = validate_interval(9).unwrap_err();
        assert_matches!(err, CoreError::InvalidSetting { field: "interval", .. });
        assert!(err.is_config_error());
    }

    #[test]
    fn partial_json_uses_defaults() {
        let json = r#"{"credentials":{"user_account":"stu123"},"monitor":{"interval_secs":30}}"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.credentials.user_account, "stu123");
        assert_eq!(config.credentials.target_url, DEFAULT_TARGET_URL);
        assert_eq!(config.monitor.interval_secs, 30);
        assert_eq!(config.monitor.endpoints.len(), 3);
        assert!(config.monitor.enabled);
        assert_eq!(config.gate.probe_timeout_ms, 2_000);
    }

    #[test]
    fn validate_rejects_short_interval_and_empty_endpoints() {
        let mut config = AppConfig::default_config();
        config.monitor.interval_secs = 5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default_config();
        config.monitor.endpoints.clear();
        assert_matches!(
            config.validate(),
            Err(CoreError::InvalidSetting { field: "endpoints", .. })
        );
    }
}
