//! portguard 공통 크레이트
//!
//! 데몬, CLI, 필터 엔진이 공유하는 설정/에러/파이프라인 trait/메트릭 이름을 정의합니다.
//! 패킷 단위 분류 로직은 `portguard-ebpf-common`에 있습니다.

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, FilterError, PipelineError, PortguardError};

// 설정
pub use config::{FilterConfig, GeneralConfig, MetricsConfig, PortguardConfig};

// 파이프라인 trait
pub use pipeline::{HealthStatus, Pipeline};
