//! # campusnet-core
//!
//! campusnet 도메인 모델, 포트(trait) 정의, 에러 타입, 설정.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 자격 증명, 로그인 결과, 연결 상태, 상태 이벤트
//! - [`ports`]: 프로브/로그인/상태 싱크 포트 인터페이스 (async_trait)
//! - [`backoff`]: 시작 시 연결 확인용 선형 백오프
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 애플리케이션 설정 구조체
//! - [`config_manager`]: 설정 파일 관리 (로드/저장/초기화)

pub mod backoff;
pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;
