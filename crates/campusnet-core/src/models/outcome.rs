//! 로그인 시도 결과 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 로그인 결과 분류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginClassification {
    /// 응답 해석까지 모두 성공
    Success,
    /// 전송 계층 실패 (연결, 타임아웃, TLS)
    NetworkError,
    /// 응답 본문이 JSON이 아님
    BadResponseFormat,
    /// `userIndex` 필드 없음
    MissingField,
    /// `userIndex`가 올바른 16진수 문자열이 아님
    HexDecodeError,
    /// 디코딩된 페이로드의 세그먼트가 3개 미만
    MalformedPayload,
}

impl LoginClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginClassification::Success => "success",
            LoginClassification::NetworkError => "network_error",
            LoginClassification::BadResponseFormat => "bad_response_format",
            LoginClassification::MissingField => "missing_field",
            LoginClassification::HexDecodeError => "hex_decode_error",
            LoginClassification::MalformedPayload => "malformed_payload",
        }
    }

    /// 일시적 실패 여부 (다음 모니터 주기에 자연스럽게 재시도됨)
    pub fn is_transient(&self) -> bool {
        matches!(self, LoginClassification::NetworkError)
    }
}

impl fmt::Display for LoginClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `userIndex`에서 디코딩된 필드
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIndex {
    /// 장치 식별자
    pub device_id: String,
    /// 할당된 IP 주소
    pub assigned_ip: String,
    /// 서버가 되돌려 준 계정
    pub account_echo: String,
}

/// 로그인 1회 시도 결과 (불변)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginOutcome {
    /// 시도 시각
    pub attempted_at: DateTime<Utc>,
    /// HTTP 상태 코드 (전송 실패 시 없음)
    pub status_code: Option<u16>,
    /// 원본 응답 본문
    pub raw_body: String,
    /// 디코딩된 `userIndex` 필드
    pub user_index: Option<UserIndex>,
    /// 되돌려 받은 계정이 제출한 계정과 일치하는지 (디코딩 성공 시에만)
    pub account_consistent: Option<bool>,
    /// 결과 분류
    pub classification: LoginClassification,
    /// 사람이 읽을 수 있는 진단 메시지
    pub diagnostic: String,
}

impl LoginOutcome {
    /// 성공 결과 생성
    pub fn success(status_code: u16, raw_body: String, user_index: UserIndex, submitted_account: &str) -> Self {
        let consistent = user_index.account_echo == submitted_account;
        let diagnostic = if consistent {
            format!(
                "로그인 성공: 장치={}, IP={}, 계정={}",
                user_index.device_id, user_index.assigned_ip, user_index.account_echo
            )
        } else {
            format!(
                "로그인 성공 (계정 불일치: 제출={}, 응답={}): 장치={}, IP={}",
                submitted_account, user_index.account_echo, user_index.device_id, user_index.assigned_ip
            )
        };

        Self {
            attempted_at: Utc::now(),
            status_code: Some(status_code),
            raw_body,
            user_index: Some(user_index),
            account_consistent: Some(consistent),
            classification: LoginClassification::Success,
            diagnostic,
        }
    }

    /// 실패 결과 생성
    pub fn failure(
        classification: LoginClassification,
        status_code: Option<u16>,
        raw_body: String,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self {
            attempted_at: Utc::now(),
            status_code,
            raw_body,
            user_index: None,
            account_consistent: None,
            classification,
            diagnostic: diagnostic.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.classification == LoginClassification::Success
    }
}
