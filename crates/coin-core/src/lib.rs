//! # Coin Core
//!
//! 코인 시세 수집기의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 수집 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 종목(Instrument) 차원 테이블 모델
//! - 시세 스냅샷(Measurement) 시계열 모델
//! - 스크래핑 원시 레코드(RawRecord)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use logging::*;
