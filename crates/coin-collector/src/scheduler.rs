//! 주기 수집 스케줄러.
//!
//! 고정 주기로 [`Collector::collect_once`]를 백그라운드 태스크에서 실행합니다.
//! - 첫 실행은 `start()` 직후
//! - 실패한 실행은 로그만 남기고 다음 주기로 넘어감
//! - 수동 실행(`run_now`)과 주기 실행은 같은 잠금을 공유하므로 동시에 하나만 실행
//! - 수동 실행은 별도 태스크에서 돌기 때문에 호출자가 기다림을 취소해도 끝까지 실행되고 기록됨
//! - `stop()`은 진행 중인 실행이 끝난 뒤 루프를 종료

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use coin_core::SchedulerConfig;
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::{CollectOutcome, CollectionStats, Collector, CollectorError, Result};

/// 실행 계기.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    /// 주기 실행
    Scheduled,
    /// API/CLI 요청
    Manual,
}

/// 마지막 실행 요약.
#[derive(Debug, Clone, Serialize)]
pub struct LastRun {
    pub trigger: RunTrigger,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<CollectionStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 스케줄러 상태 스냅샷.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    /// 백그라운드 루프 동작 여부
    pub running: bool,
    /// 현재 수집 진행 중 여부
    pub in_flight: bool,
    pub interval_secs: u64,
    pub completed_runs: u64,
    pub failed_runs: u64,
    pub last_run: Option<LastRun>,
}

type LoopTask = (CancellationToken, JoinHandle<()>);

/// 주기 수집 스케줄러.
pub struct Scheduler {
    collector: Arc<Collector>,
    period: Duration,
    run_guard: Mutex<()>,
    last_run: RwLock<Option<LastRun>>,
    completed_runs: AtomicU64,
    failed_runs: AtomicU64,
    task: std::sync::Mutex<Option<LoopTask>>,
}

impl Scheduler {
    pub fn new(collector: Arc<Collector>, period: Duration) -> Self {
        Self {
            collector,
            period,
            run_guard: Mutex::new(()),
            last_run: RwLock::new(None),
            completed_runs: AtomicU64::new(0),
            failed_runs: AtomicU64::new(0),
            task: std::sync::Mutex::new(None),
        }
    }

    pub fn from_config(collector: Arc<Collector>, config: &SchedulerConfig) -> Self {
        Self::new(collector, config.interval())
    }

    pub fn collector(&self) -> &Arc<Collector> {
        &self.collector
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 백그라운드 루프가 동작 중인지 확인
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }

    /// 백그라운드 루프를 시작합니다. 이미 동작 중이면 false.
    pub fn start(self: &Arc<Self>) -> bool {
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|(_, handle)| !handle.is_finished()) {
            warn!("스케줄러가 이미 실행 중입니다");
            return false;
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(self).run_loop(token.clone()));
        *task = Some((token, handle));

        info!(
            interval_secs = self.period.as_secs(),
            url = self.collector.source_url(),
            "스케줄러 시작"
        );
        true
    }

    /// 루프를 종료하고 태스크가 끝날 때까지 기다립니다.
    pub async fn stop(&self) {
        let task = self.task.lock().unwrap_or_else(PoisonError::into_inner).take();

        if let Some((token, handle)) = task {
            token.cancel();
            if let Err(e) = handle.await {
                error!(error = %e, "스케줄러 태스크 비정상 종료");
            }
            info!("스케줄러 중지");
        }
    }

    /// 즉시 한 번 수집합니다. 진행 중인 실행이 있으면 끝날 때까지 기다립니다.
    ///
    /// 반환된 future를 drop해도 수집은 계속되고 결과는 `status()`에 남습니다.
    pub async fn run_now(self: &Arc<Self>) -> Result<CollectOutcome> {
        let scheduler = Arc::clone(self);
        let handle = tokio::spawn(async move { scheduler.execute(RunTrigger::Manual).await });

        handle.await.map_err(|e| {
            error!(error = %e, "수동 수집 태스크 비정상 종료");
            CollectorError::Task(e.to_string())
        })?
    }

    pub async fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.is_running(),
            in_flight: self.run_guard.try_lock().is_err(),
            interval_secs: self.period.as_secs(),
            completed_runs: self.completed_runs.load(Ordering::Relaxed),
            failed_runs: self.failed_runs.load(Ordering::Relaxed),
            last_run: self.last_run.read().await.clone(),
        }
    }

    async fn run_loop(self: Arc<Self>, token: CancellationToken) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    // 실패는 execute에서 기록하고 다음 주기로
                    let _ = self.execute(RunTrigger::Scheduled).await;
                }
            }
        }

        info!("스케줄러 루프 종료");
    }

    async fn execute(&self, trigger: RunTrigger) -> Result<CollectOutcome> {
        let _guard = self.run_guard.lock().await;
        let started_at = Utc::now();

        let result = self.collector.collect_once().await;
        let finished_at = Utc::now();

        let last = match &result {
            Ok(outcome) => {
                self.completed_runs.fetch_add(1, Ordering::Relaxed);
                outcome.stats.log_summary("시세 수집");
                LastRun {
                    trigger,
                    started_at,
                    finished_at,
                    success: true,
                    stats: Some(outcome.stats.clone()),
                    error: None,
                }
            }
            Err(e) => {
                self.failed_runs.fetch_add(1, Ordering::Relaxed);
                error!(trigger = ?trigger, error = %e, "시세 수집 실패");
                LastRun {
                    trigger,
                    started_at,
                    finished_at,
                    success: false,
                    stats: None,
                    error: Some(e.to_string()),
                }
            }
        };

        *self.last_run.write().await = Some(last);
        result
    }
}
