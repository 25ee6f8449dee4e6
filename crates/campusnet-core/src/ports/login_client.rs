//! 포털 로그인 포트.
//!
//! 구현: `campusnet-network` crate (`HttpLoginClient`)

use async_trait::async_trait;

use crate::models::credentials::Credentials;
use crate::models::outcome::LoginOutcome;

/// 인증 요청 1회 수행.
///
/// 전송/파싱 실패도 모두 분류된 [`LoginOutcome`]으로 반환하며 재시도하지 않는다.
#[async_trait]
pub trait LoginClient: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> LoginOutcome;
}
