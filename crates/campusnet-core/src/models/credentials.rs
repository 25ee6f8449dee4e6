//! 로그인 자격 증명 모델.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 통신사(서비스 제공자) 선택자
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceProvider {
    /// 중국이동 (China Mobile)
    #[default]
    Cmcc,
    /// 중국전신 (China Telecom)
    Telecom,
}

impl ServiceProvider {
    /// ePortal `service` 필드에 그대로 실리는 값.
    ///
    /// 포털은 퍼센트 인코딩된 서비스명 문자열 자체를 값으로 받는다
    /// (폼 인코딩 시 `%`가 한 번 더 인코딩된다).
    pub fn wire_value(&self) -> &'static str {
        match self {
            ServiceProvider::Cmcc => "%E4%B8%AD%E5%9B%BD%E7%A7%BB%E5%8A%A8%E5%AE%BD%E5%B8%A6",
            ServiceProvider::Telecom => "%E4%B8%AD%E5%9B%BD%E7%94%B5%E4%BF%A1%E5%AE%BD%E5%B8%A6",
        }
    }

    /// 설정 파일 표기
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceProvider::Cmcc => "cmcc",
            ServiceProvider::Telecom => "telecom",
        }
    }
}

impl fmt::Display for ServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceProvider {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cmcc" => Ok(ServiceProvider::Cmcc),
            "telecom" => Ok(ServiceProvider::Telecom),
            other => Err(CoreError::InvalidSetting {
                field: "service",
                message: format!("알 수 없는 서비스 제공자: {other}"),
            }),
        }
    }
}

/// 로그인 자격 증명 (불변)
///
/// 비밀번호는 브라우저 측에서 이미 암호화된 blob이며, 네트워크 파라미터는
/// 포털이 리다이렉트 URL에 실어 주는 쿼리 문자열이다. 둘 다 해석하지 않고 그대로 전송한다.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    account_id: String,
    encrypted_password: String,
    service: ServiceProvider,
    network_params: String,
    target_url: String,
}

impl Credentials {
    /// 새 자격 증명 생성
    pub fn new(
        account_id: impl Into<String>,
        encrypted_password: impl Into<String>,
        service: ServiceProvider,
        network_params: impl Into<String>,
        target_url: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            encrypted_password: encrypted_password.into(),
            service,
            network_params: network_params.into(),
            target_url: target_url.into(),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn encrypted_password(&self) -> &str {
        &self.encrypted_password
    }

    pub fn service(&self) -> ServiceProvider {
        self.service
    }

    pub fn network_params(&self) -> &str {
        &self.network_params
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("encrypted_password", &"***")
            .field("service", &self.service)
            .field("network_params", &format!("<{} bytes>", self.network_params.len()))
            .field("target_url", &self.target_url)
            .finish()
    }
}
