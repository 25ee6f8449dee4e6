//! # campusnet-network
//!
//! 네트워크 어댑터.
//! TCP 도달성 프로브, ePortal 폼 로그인 클라이언트, 연결 상태 추적기를 제공한다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use campusnet_network::login_client::HttpLoginClient;
//! use campusnet_network::probe::TcpProbe;
//!
//! let client = HttpLoginClient::new(Duration::from_secs(30), DEFAULT_USER_AGENT)?;
//! let outcome = client.login(&credentials).await;
//! ```

pub mod connectivity;
pub mod login_client;
pub mod probe;
