//! campusnet 도메인 모델.
//!
//! 자격 증명, 로그인 결과, 연결 상태, 상태 이벤트를 정의한다.

pub mod connectivity;
pub mod credentials;
pub mod outcome;
pub mod status;
