//! CoinMarketCap 시세 목록 페이지 HTTP 클라이언트.
//!
//! 세션(`reqwest::Client`)은 한 번의 파이프라인 실행 동안만 유지되고
//! 실행이 끝나면 drop 됩니다. 재시도는 하지 않습니다.
//!
//! ## 사용 예시
//! ```rust,ignore
//! let session = CoinMarketCapClient::open(&ScraperConfig::default())?;
//! let body = session.fetch_listing().await?;
//! ```

use coin_core::ScraperConfig;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, error};

/// 브라우저 User-Agent.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/57.0.2987.133 Safari/537.36";

/// 고정 요청 헤더 (User-Agent 제외).
const BROWSER_HEADERS: [(&str, &str); 4] = [
    (
        "accept",
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
    ),
    (
        "accept-language",
        "ru-RU,ru;q=0.8,en-US;q=0.6,en;q=0.4,uk;q=0.2",
    ),
    ("cache-control", "max-age=0"),
    ("upgrade-insecure-requests", "1"),
];

/// 페이지 수집 에러
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP 세션 생성 실패: {0}")]
    Session(#[source] reqwest::Error),

    #[error("HTTP 응답 상태 오류: {status} ({url})")]
    Status { status: u16, url: String },

    #[error("HTTP 요청 실패: {0}")]
    Transport(#[from] reqwest::Error),
}

impl FetchError {
    /// 비정상 응답의 상태 코드 (전송 실패는 None)
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 타임아웃으로 인한 실패인지 확인
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(BROWSER_HEADERS.len());
    for (name, value) in BROWSER_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    headers
}

/// 시세 목록 페이지 HTTP 세션.
///
/// TLS 인증서 검증은 기본값(활성)을 그대로 사용합니다.
pub struct CoinMarketCapClient {
    client: Client,
    url: String,
}

impl CoinMarketCapClient {
    /// 새 세션을 엽니다.
    pub fn open(config: &ScraperConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .default_headers(browser_headers())
            .build()
            .map_err(FetchError::Session)?;

        debug!(url = %config.url, "HTTP 세션 생성");

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// 설정된 수집 대상 URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 설정된 시세 목록 페이지를 가져옵니다.
    pub async fn fetch_listing(&self) -> Result<String, FetchError> {
        self.fetch(&self.url).await
    }

    /// 단일 GET 요청을 보내고 2xx 응답 본문을 반환합니다.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        debug!(url, "페이지 요청");

        let response = self.client.get(url).send().await.map_err(|e| {
            error!(url, error = %e, "페이지 요청 전송 실패");
            FetchError::Transport(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(url, status = status.as_u16(), "페이지 응답 오류");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        debug!(url, bytes = body.len(), "페이지 수신 완료");

        Ok(body)
    }
}
