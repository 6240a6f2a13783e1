//! CoinWatch API 서버.
//!
//! Axum 기반 REST API 서버를 시작합니다.
//! 설정에 따라 주기 수집 스케줄러도 함께 실행합니다.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use coin_api::openapi::swagger_ui_router;
use coin_api::routes::{create_api_router, scrape_route_timeout};
use coin_api::state::AppState;
use coin_collector::{Collector, Scheduler};
use coin_core::{init_logging, AppConfig, ScraperConfig, DEFAULT_CONFIG_PATH};
use coin_data::open_store;

/// CORS 레이어 생성.
///
/// CORS_ORIGINS 환경변수가 설정되어 있으면 해당 origin만 허용합니다.
/// 설정되지 않으면 개발 모드로 간주하여 모든 origin을 허용합니다.
fn cors_layer() -> CorsLayer {
    let allow_origin = match std::env::var("CORS_ORIGINS") {
        Ok(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ORIGINS is set but contains no valid origins, allowing any");
                AllowOrigin::any()
            } else {
                info!("CORS configured with {} allowed origins", origins.len());
                AllowOrigin::list(origins)
            }
        }
        _ => {
            warn!("CORS_ORIGINS not set, allowing any origin (development mode)");
            AllowOrigin::any()
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}

/// 전체 라우터 생성.
///
/// 요청 타임아웃은 라우트 그룹별로 `create_api_router`에서 적용합니다.
fn create_router(state: Arc<AppState>, scraper: &ScraperConfig) -> Router {
    create_api_router(scrape_route_timeout(scraper))
        .with_state(state)
        // OpenAPI 문서 및 Swagger UI
        .merge(swagger_ui_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path =
        std::env::var("COIN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load(&config_path)
        .with_context(|| format!("설정 파일 로드 실패: {}", config_path))?;

    init_logging(&config.logging)
        .map_err(|e| anyhow::anyhow!("로깅 초기화 실패: {}", e))?;

    info!("Starting CoinWatch API server...");

    let store = open_store(&config.database)
        .await
        .context("저장소 초기화 실패")?;
    info!(backend = store.backend(), "저장소 준비 완료");

    let collector = Collector::new(config.scraper.clone(), store.clone())
        .context("수집기 초기화 실패")?;
    let scheduler = Arc::new(Scheduler::from_config(
        Arc::new(collector),
        &config.scheduler,
    ));

    if config.scheduler.enabled {
        scheduler.start();
    } else {
        info!("주기 수집 비활성화 (scheduler.enabled = false)");
    }

    let state = Arc::new(AppState::new(store, Arc::clone(&scheduler)));
    let app = create_router(state, &config.scraper);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "잘못된 서버 주소: {}:{}",
                config.server.host, config.server.port
            )
        })?;

    info!(%addr, "API server listening");
    info!("Swagger UI available at http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("포트 바인드 실패: {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("서버 실행 실패")?;

    info!("Server shutdown initiated, cleaning up...");

    // 진행 중인 수집은 끝까지 실행된 뒤 루프 종료
    scheduler.stop().await;

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 반환합니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
