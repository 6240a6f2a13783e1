//! 시세 목록 주기 수집기.
//!
//! 수집 파이프라인과 reconcile을 하나의 실행으로 묶고([`Collector`]),
//! 고정 주기로 백그라운드에서 실행합니다([`Scheduler`]).
//!
//! # 사용법
//!
//! ```bash
//! # 한 번 수집
//! coin-collector collect
//!
//! # 페이지의 종목을 등록하고 첫 스냅샷 저장
//! coin-collector sync-instruments
//!
//! # 데몬 모드 (Ctrl+C로 종료)
//! coin-collector daemon
//! ```

pub mod collect;
pub mod error;
pub mod scheduler;
pub mod stats;

pub use collect::{CollectOutcome, Collector};
pub use error::{CollectorError, Result};
pub use scheduler::{LastRun, RunTrigger, Scheduler, SchedulerStatus};
pub use stats::CollectionStats;
