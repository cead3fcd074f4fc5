//! portguard XDP 필터 -- 유저스페이스 로더와 맵 제어 평면
//!
//! 커널의 `port_filter` / `process_filter` XDP 프로그램을 로드해 인터페이스에
//! 어태치하고, 고정(pinned)된 `TARGET_PORT` / `STATS` 맵을 통해 차단 포트를
//! 바꾸고 카운터를 읽습니다.
//!
//! # 모듈 구성
//! - [`config`]: 정책/XDP 모드 해석 + core 설정 확장
//! - [`engine`]: FilterEngine -- XDP 프로그램 로드/관리, Pipeline trait 구현
//! - [`maps`]: PortControl -- TARGET_PORT / STATS 맵 읽기·쓰기
//! - [`stats`]: 누적 카운터 → 통과 수, 드롭 비율, 초당 처리량
//!
//! # 공유 타입
//! 커널/유저스페이스 공유 타입과 분류 로직은 [`portguard_ebpf_common`] 크레이트에
//! 정의되어 있습니다.

pub mod config;
pub mod engine;
pub mod maps;
pub mod stats;

// --- 주요 타입 re-export ---

// 엔진
pub use engine::{FilterEngine, FilterEngineBuilder};

// 설정
pub use config::{EngineConfig, PolicyKind, XdpMode};

// 맵 제어
#[cfg(target_os = "linux")]
pub use maps::FilterMaps;
pub use maps::{InMemoryMaps, PortControl};

// 통계
pub use stats::FilterStats;

// 공유 타입 (커널/유저스페이스 공통)
pub use portguard_ebpf_common;
