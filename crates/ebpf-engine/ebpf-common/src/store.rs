//! 공유 상태 계약 -- ConfigStore / StatsCounter
//!
//! 결정 파이프라인은 전역 맵에 직접 접근하지 않고 이 trait을 주입받습니다.
//! 커널 프로그램은 BPF 맵으로, 유저스페이스 테스트는 아래의 atomic 구현으로
//! 같은 파이프라인을 구동합니다.

#[cfg(not(target_arch = "bpf"))]
use core::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::{DEFAULT_TARGET_PORT, STATS_IDX_DROPPED, STATS_IDX_TOTAL};

/// 차단(포트 정책) 대상 포트를 제공하는 읽기 전용 설정 저장소
///
/// 패킷마다 새로 조회하며 캐시하지 않습니다. 구현은 블로킹하거나 실패해서는 안 됩니다.
pub trait ConfigStore {
    /// 설정 슬롯을 조회합니다. 값이 없으면 `None`.
    fn lookup_target_port(&self) -> Option<u16>;

    /// 설정된 포트, 없으면 기본값 4040을 반환합니다.
    #[doc(alias = "get_target_port")]
    #[inline(always)]
    fn target_port(&self) -> u16 {
        self.lookup_target_port().unwrap_or(DEFAULT_TARGET_PORT)
    }
}

/// 통계 슬롯
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsSlot {
    /// 분류된 전체 패킷 수
    Total = STATS_IDX_TOTAL,
    /// 드롭된 패킷 수
    Dropped = STATS_IDX_DROPPED,
}

impl StatsSlot {
    /// 맵 인덱스
    #[inline(always)]
    pub const fn index(self) -> u32 {
        self as u32
    }
}

/// 단조 증가 카운터
///
/// 여러 실행 컨텍스트에서 동시에 호출되어도 갱신이 유실되지 않아야 합니다
/// (락 없는 fetch-and-add). 슬롯이 없으면 조용히 건너뜁니다.
pub trait StatsCounter {
    /// 슬롯을 1 증가시킵니다.
    fn increment(&self, slot: StatsSlot);

    #[inline(always)]
    fn increment_total(&self) {
        self.increment(StatsSlot::Total);
    }

    #[inline(always)]
    fn increment_dropped(&self) {
        self.increment(StatsSlot::Dropped);
    }
}

/// 통계를 기록하지 않는 카운터 (프로세스 정책용)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStats;

impl StatsCounter for NoStats {
    #[inline(always)]
    fn increment(&self, _slot: StatsSlot) {}
}

/// 통계 맵 스냅샷
///
/// `STATS` 맵의 두 슬롯을 읽어 구성합니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsRecord {
    /// 분류된 전체 패킷 수
    pub total: u64,
    /// 드롭된 패킷 수
    pub dropped: u64,
}

// =============================================================================
// 호스트 구현 (유저스페이스 제어 평면 / 테스트용)
// =============================================================================

/// 값 없음 표식 (u16 범위 밖)
#[cfg(not(target_arch = "bpf"))]
const PORT_ABSENT: u32 = u32::MAX;

/// 락 없는 단일 슬롯 설정 저장소
///
/// 쓰기는 제어 평면에서만 발생하며, 읽기는 Relaxed 로드 한 번입니다.
/// 동시 패킷은 이전 값 또는 새 값을 관측합니다 (last-write-wins).
#[cfg(not(target_arch = "bpf"))]
#[derive(Debug)]
pub struct AtomicConfigStore {
    port: AtomicU32,
}

#[cfg(not(target_arch = "bpf"))]
impl AtomicConfigStore {
    /// 비어 있는 저장소 (기본 포트 사용)
    pub const fn new() -> Self {
        Self {
            port: AtomicU32::new(PORT_ABSENT),
        }
    }

    /// 포트가 설정된 저장소
    pub const fn with_port(port: u16) -> Self {
        Self {
            port: AtomicU32::new(port as u32),
        }
    }

    pub fn set(&self, port: u16) {
        self.port.store(u32::from(port), Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.port.store(PORT_ABSENT, Ordering::Relaxed);
    }
}

#[cfg(not(target_arch = "bpf"))]
impl Default for AtomicConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_arch = "bpf"))]
impl ConfigStore for AtomicConfigStore {
    fn lookup_target_port(&self) -> Option<u16> {
        u16::try_from(self.port.load(Ordering::Relaxed)).ok()
    }
}

/// 락 없는 2슬롯 카운터
#[cfg(not(target_arch = "bpf"))]
#[derive(Debug, Default)]
pub struct AtomicStatsCounter {
    total: AtomicU64,
    dropped: AtomicU64,
}

#[cfg(not(target_arch = "bpf"))]
impl AtomicStatsCounter {
    pub const fn new() -> Self {
        Self {
            total: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// 현재 값을 읽습니다. 두 슬롯은 독립적으로 읽힙니다.
    pub fn snapshot(&self) -> StatsRecord {
        StatsRecord {
            total: self.total.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

#[cfg(not(target_arch = "bpf"))]
impl StatsCounter for AtomicStatsCounter {
    fn increment(&self, slot: StatsSlot) {
        let counter = match slot {
            StatsSlot::Total => &self.total,
            StatsSlot::Dropped => &self.dropped,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}
