//! portguard 커널/유저스페이스 공유 패킷 분류 파이프라인
//!
//! 이 크레이트는 `#![no_std]` 환경에서 사용 가능한 분류/판정 로직과 맵 레이아웃을 정의합니다.
//! XDP 프로그램과 유저스페이스 테스트가 같은 코드를 구동하며, 맵 접근은
//! [`ConfigStore`] / [`StatsCounter`] trait으로 주입됩니다.
//!
//! # 파이프라인
//! ```text
//! frame ──▶ PacketView ──▶ classify ──▶ Policy::decide ──▶ Verdict
//!                              │
//!                              └──▶ PassEarly ──▶ Pass (fail-open)
//! ```
//!
//! # 맵 타입 선택 근거
//! - **HashMap** (`TARGET_PORT`): 엔트리 1개. 키가 없으면 기본 포트(4040) 사용
//! - **Array** (`STATS`): 슬롯 2개(total, dropped). 모든 CPU가 같은 슬롯을 원자적으로 증가

#![no_std]

pub mod parser;
pub mod policy;
pub mod store;
pub mod view;

pub use parser::{Classified, PassEarly, TcpOffset, classify};
pub use policy::{
    Policy, PortPolicy, ProcessHeuristic, ProcessPolicy, Verdict, evaluate, try_evaluate,
};
#[cfg(not(target_arch = "bpf"))]
pub use store::{AtomicConfigStore, AtomicStatsCounter};
pub use store::{ConfigStore, NoStats, StatsCounter, StatsRecord, StatsSlot};
pub use view::{FrameBytes, PacketView};

// =============================================================================
// 프로그램 / 맵 이름 상수
// =============================================================================

/// 포트 정책 XDP 프로그램 이름
pub const PROG_PORT_FILTER: &str = "port_filter";
/// 프로세스 정책 XDP 프로그램 이름
pub const PROG_PROCESS_FILTER: &str = "process_filter";

/// 차단 포트 HashMap 맵 이름
pub const MAP_TARGET_PORT: &str = "TARGET_PORT";
/// 통계 Array 맵 이름
pub const MAP_STATS: &str = "STATS";

// =============================================================================
// 설정 맵
// =============================================================================

/// `TARGET_PORT` 맵의 유일한 키
pub const CONFIG_KEY_TARGET_PORT: u32 = 0;
/// 설정 맵이 비어 있을 때 차단하는 포트
pub const DEFAULT_TARGET_PORT: u16 = 4040;

// =============================================================================
// Stats 맵 인덱스 (Array)
// =============================================================================

/// 전체 패킷 인덱스
pub const STATS_IDX_TOTAL: u32 = 0;
/// 드롭 패킷 인덱스
pub const STATS_IDX_DROPPED: u32 = 1;
/// Array 최대 엔트리 수
pub const STATS_MAX_ENTRIES: u32 = 2;

// =============================================================================
// 헤더 레이아웃
// =============================================================================

/// Ethernet 헤더 길이
pub const ETH_HDR_LEN: usize = 14;
/// IPv4 EtherType
pub const ETH_P_IPV4: u16 = 0x0800;
/// 옵션 없는 IPv4 헤더 길이
pub const IPV4_HDR_LEN: usize = 20;
/// TCP 출발지/목적지 포트 길이
pub const TCP_PORTS_LEN: usize = 4;
/// TCP 프로토콜 번호
pub const PROTO_TCP: u8 = 6;

// =============================================================================
// 프로세스 정책 상수
// =============================================================================

/// 대상 프로세스에 허용되는 유일한 포트
pub const PROCESS_ALLOWED_PORT: u16 = 4040;
/// 프로세스 휴리스틱 포트 범위 시작 (포함)
pub const PROCESS_PORT_RANGE_START: u16 = 4000;
/// 프로세스 휴리스틱 포트 범위 끝 (포함)
pub const PROCESS_PORT_RANGE_END: u16 = 5000;
