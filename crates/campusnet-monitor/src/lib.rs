//! # campusnet-monitor
//!
//! 백그라운드 태스크 계층.
//! 시작 시 연결 확인(게이트), 주기적 연결 모니터, 단발성 진단,
//! 로그인 직렬화 지점, 상태 이벤트 허브를 제공한다.

pub mod diagnostics;
pub mod dispatcher;
pub mod gate;
pub mod monitor_loop;
pub mod status;
