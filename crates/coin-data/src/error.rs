//! 저장소 오류 타입.

use thiserror::Error;

/// 저장소 관련 오류.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 같은 정규화 이름의 종목이 이미 존재
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// 레코드를 찾을 수 없음
    #[error("Not found: {0}")]
    NotFound(String),

    /// 잘못된 입력 (빈 이름 등)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 쿼리/트랜잭션 실패
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    Connection(String),

    /// 마이그레이션 오류
    #[error("Migration error: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Row not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Connection(err.to_string())
            }
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                match code.as_ref() {
                    // PostgreSQL 고유 제약 조건 위반
                    "23505" => StoreError::AlreadyExists(db_err.message().to_string()),
                    // 외래 키 위반 (동시 삭제된 종목)
                    "23503" => StoreError::NotFound(db_err.message().to_string()),
                    _ => StoreError::Persistence(db_err.message().to_string()),
                }
            }
            _ => StoreError::Persistence(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
