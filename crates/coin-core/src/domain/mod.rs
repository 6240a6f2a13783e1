//! 도메인 모델.
//!
//! - [`instrument`]: 종목 차원 (이름/심볼 정규화, 이름 또는 심볼 기반 조회 키)
//! - [`measurement`]: 종목별 시세 스냅샷 (append-only)
//! - [`record`]: 파이프라인 내부에서만 사용하는 9-필드 원시 레코드

pub mod instrument;
pub mod measurement;
pub mod record;

pub use instrument::{normalize_name, normalize_symbol, Instrument, InstrumentRef};
pub use measurement::{Measurement, MeasurementFields};
pub use record::RawRecord;
