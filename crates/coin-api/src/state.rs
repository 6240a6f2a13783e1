//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 Arc로 래핑되어 여러 요청 간에 공유됩니다.
//! 저장소와 스케줄러는 `main`에서 한 번 만들어 주입합니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use coin_collector::Scheduler;
use coin_data::MarketStore;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 종목/시세 저장소
    pub store: Arc<dyn MarketStore>,

    /// 주기 수집 스케줄러 (즉시 수집도 이 스케줄러를 통해 실행)
    pub scheduler: Arc<Scheduler>,

    /// 서버 시작 시각
    pub started_at: DateTime<Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    pub fn new(store: Arc<dyn MarketStore>, scheduler: Arc<Scheduler>) -> Self {
        Self {
            store,
            scheduler,
            started_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 서버 업타임(초)
    pub fn uptime_secs(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_seconds()
    }

    /// 저장소 상태 확인
    pub async fn is_store_healthy(&self) -> bool {
        self.store.health_check().await.is_ok()
    }
}

/// 테스트용 AppState 생성 헬퍼.
///
/// 인메모리 저장소를 사용하고, 수집 대상은 응답하지 않는 로컬 주소입니다.
/// 스케줄러는 시작하지 않습니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    create_test_state_with_source("http://127.0.0.1:1/listing")
}

/// 지정한 수집 대상 URL로 테스트용 AppState를 생성합니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state_with_source(url: &str) -> AppState {
    use coin_collector::Collector;
    use coin_core::ScraperConfig;
    use coin_data::MemoryMarketStore;
    use std::time::Duration;

    let store: Arc<dyn MarketStore> = Arc::new(MemoryMarketStore::new());
    let collector = Collector::new(ScraperConfig::default().with_url(url), store.clone())
        .expect("Failed to create Collector for test");
    let scheduler = Scheduler::new(Arc::new(collector), Duration::from_secs(600));

    AppState::new(store, Arc::new(scheduler))
}
