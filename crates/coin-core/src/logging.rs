//! 로깅 초기화.
//!
//! `[logging]` 설정 섹션으로 tracing 구독자를 구성합니다.
//! 형식은 `LOG_FORMAT`, 레벨은 `RUST_LOG` 환경 변수가 설정 파일보다 우선합니다.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// 로깅 초기화 에러.
pub type LoggingError = Box<dyn std::error::Error + Send + Sync>;

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 개발용
    #[default]
    Pretty,
    /// 로그 수집기용
    Json,
    /// 한 줄 형식
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

impl LogFormat {
    /// 환경 변수 값이 유효하면 우선 사용하고, 아니면 설정값, 둘 다 아니면 pretty.
    fn select(env_value: Option<&str>, configured: &str) -> Self {
        env_value
            .and_then(|s| s.parse().ok())
            .or_else(|| configured.parse().ok())
            .unwrap_or_default()
    }
}

/// 설정에 따라 전역 tracing 구독자를 설치합니다.
///
/// 두 번 호출하면 에러를 반환합니다.
pub fn init_logging(settings: &LoggingConfig) -> Result<(), LoggingError> {
    let format = LogFormat::select(std::env::var("LOG_FORMAT").ok().as_deref(), &settings.format);
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&settings.level))?;

    let fmt_layer = match format {
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Compact => fmt::layer().compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .try_init()?;

    tracing::info!(?format, level = %settings.level, "Logging initialized");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("verbose".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_env_format_overrides_config() {
        assert_eq!(LogFormat::select(Some("json"), "compact"), LogFormat::Json);
        // 잘못된 환경 변수 값은 무시
        assert_eq!(LogFormat::select(Some("xml"), "compact"), LogFormat::Compact);
        assert_eq!(LogFormat::select(None, "compact"), LogFormat::Compact);
        assert_eq!(LogFormat::select(None, "unknown"), LogFormat::Pretty);
    }
}
