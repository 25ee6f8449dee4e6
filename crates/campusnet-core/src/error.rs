//! campusnet 핵심 에러 타입.
//!
//! 로그인 실패는 에러가 아니라 [`LoginOutcome`](crate::models::outcome::LoginOutcome) 값으로
//! 표현한다. 이 타입은 설정/제어면/어댑터 생성 에러만 다룬다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 설정 파일 로드/저장 실패
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필수 자격 증명 필드 누락, 자동 로그인 비활성화
    #[error("설정 불완전, 누락 필드: {}", .missing.join(", "))]
    ConfigIncomplete {
        /// 누락된 필드명 (설정 키 이름)
        missing: Vec<&'static str>,
    },

    /// 제어면에서 허용되지 않는 설정값 (간격 하한 미달, 빈 엔드포인트 목록 등)
    #[error("잘못된 설정값 ({field}): {message}")]
    InvalidSetting {
        /// 설정 항목
        field: &'static str,
        /// 거부 사유
        message: String,
    },

    /// 네트워크 에러 (HTTP 클라이언트 생성 실패 등)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 설정 계열 에러 여부 (사용자에게 설정 수정을 안내해야 하는 경우)
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            CoreError::Config(_) | CoreError::ConfigIncomplete { .. } | CoreError::InvalidSetting { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_incomplete_lists_fields() {
        let err = CoreError::ConfigIncomplete {
            missing: vec!["user_account", "network_params"],
        };
        let msg = err.to_string();
        assert!(msg.contains("user_account, network_params"));
        assert!(err.is_config_error());
    }

    #[test]
    fn network_error_is_not_config_class() {
        assert!(!CoreError::Network("timeout".to_string()).is_config_error());
        assert!(CoreError::InvalidSetting {
            field: "interval",
            message: "9".to_string()
        }
        .is_config_error());
    }
}
