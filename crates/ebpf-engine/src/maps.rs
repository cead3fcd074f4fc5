//! 맵 제어 평면 -- TARGET_PORT / STATS 읽기·쓰기
//!
//! [`PortControl`]은 데몬과 CLI가 커널 맵을 다루는 유일한 경로입니다.
//!
//! - [`FilterMaps`] (Linux): 로드된 `aya::Ebpf`에서 가져오거나 bpffs 핀에서 엽니다.
//! - [`InMemoryMaps`]: 커널 없이 같은 계약을 구현하는 호스트 구현. 공유 파이프라인의
//!   [`ConfigStore`] / [`StatsCounter`]도 구현하므로 제어 평면 쓰기가 다음 패킷에
//!   보이는지(핫 리로드) 테스트할 수 있습니다.

use portguard_core::error::PortguardError;
use portguard_ebpf_common::{
    AtomicConfigStore, AtomicStatsCounter, ConfigStore, DEFAULT_TARGET_PORT, StatsCounter,
    StatsRecord, StatsSlot,
};

/// 커널 맵 제어 인터페이스
pub trait PortControl {
    /// 차단 포트를 설정합니다. 다음 패킷부터 적용됩니다.
    fn set_target_port(&mut self, port: u16) -> Result<(), PortguardError>;

    /// 차단 포트 엔트리를 제거합니다 (커널은 기본 포트 4040으로 돌아감).
    fn clear_target_port(&mut self) -> Result<(), PortguardError>;

    /// 설정된 차단 포트. 엔트리가 없으면 `None`.
    fn read_target_port(&self) -> Result<Option<u16>, PortguardError>;

    /// 두 통계 슬롯을 읽습니다.
    fn read_stats(&self) -> Result<StatsRecord, PortguardError>;

    /// 두 통계 슬롯을 0으로 되돌립니다.
    fn reset_stats(&mut self) -> Result<(), PortguardError>;

    /// 커널이 실제로 사용하는 차단 포트 (엔트리가 없으면 기본값)
    fn effective_target_port(&self) -> Result<u16, PortguardError> {
        Ok(self.read_target_port()?.unwrap_or(DEFAULT_TARGET_PORT))
    }
}

// =============================================================================
// 호스트 구현
// =============================================================================

/// 메모리 내 맵
#[derive(Debug, Default)]
pub struct InMemoryMaps {
    config: AtomicConfigStore,
    stats: AtomicStatsCounter,
}

impl InMemoryMaps {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PortControl for InMemoryMaps {
    fn set_target_port(&mut self, port: u16) -> Result<(), PortguardError> {
        self.config.set(port);
        Ok(())
    }

    fn clear_target_port(&mut self) -> Result<(), PortguardError> {
        self.config.clear();
        Ok(())
    }

    fn read_target_port(&self) -> Result<Option<u16>, PortguardError> {
        Ok(self.config.lookup_target_port())
    }

    fn read_stats(&self) -> Result<StatsRecord, PortguardError> {
        Ok(self.stats.snapshot())
    }

    fn reset_stats(&mut self) -> Result<(), PortguardError> {
        self.stats = AtomicStatsCounter::new();
        Ok(())
    }
}

impl ConfigStore for InMemoryMaps {
    fn lookup_target_port(&self) -> Option<u16> {
        self.config.lookup_target_port()
    }
}

impl StatsCounter for InMemoryMaps {
    fn increment(&self, slot: StatsSlot) {
        self.stats.increment(slot);
    }
}

// =============================================================================
// 커널 맵 (Linux 전용)
// =============================================================================

#[cfg(target_os = "linux")]
pub use linux::FilterMaps;

#[cfg(target_os = "linux")]
mod linux {
    use std::path::Path;

    use aya::Ebpf;
    use aya::maps::{Array, HashMap, Map, MapData, MapError};
    use tracing::debug;

    use portguard_core::error::{FilterError, PortguardError};
    use portguard_ebpf_common::{
        CONFIG_KEY_TARGET_PORT, MAP_STATS, MAP_TARGET_PORT, STATS_IDX_DROPPED, STATS_IDX_TOTAL,
        StatsRecord,
    };

    use super::PortControl;

    fn map_error(map: &str, err: impl std::fmt::Display) -> PortguardError {
        FilterError::EbpfMap(format!("{map}: {err}")).into()
    }

    /// aya 맵 핸들
    pub struct FilterMaps {
        target_port: HashMap<MapData, u32, u16>,
        stats: Array<MapData, u64>,
    }

    impl FilterMaps {
        /// 로드된 오브젝트에서 맵 소유권을 가져옵니다.
        pub fn from_ebpf(bpf: &mut Ebpf) -> Result<Self, PortguardError> {
            let target_port = bpf
                .take_map(MAP_TARGET_PORT)
                .ok_or_else(|| map_error(MAP_TARGET_PORT, "map not found"))?;
            let stats = bpf
                .take_map(MAP_STATS)
                .ok_or_else(|| map_error(MAP_STATS, "map not found"))?;
            Self::from_maps(target_port, stats)
        }

        /// 실행 중인 데몬이 고정한 맵을 엽니다.
        pub fn from_pins(pin_path: &Path) -> Result<Self, PortguardError> {
            let target_port = MapData::from_pin(pin_path.join(MAP_TARGET_PORT))
                .map_err(|e| map_error(MAP_TARGET_PORT, e))?;
            let stats = MapData::from_pin(pin_path.join(MAP_STATS))
                .map_err(|e| map_error(MAP_STATS, e))?;
            debug!(pin_path = %pin_path.display(), "opened pinned maps");
            Self::from_maps(Map::HashMap(target_port), Map::Array(stats))
        }

        fn from_maps(target_port: Map, stats: Map) -> Result<Self, PortguardError> {
            Ok(Self {
                target_port: HashMap::try_from(target_port)
                    .map_err(|e| map_error(MAP_TARGET_PORT, e))?,
                stats: Array::try_from(stats).map_err(|e| map_error(MAP_STATS, e))?,
            })
        }
    }

    impl PortControl for FilterMaps {
        fn set_target_port(&mut self, port: u16) -> Result<(), PortguardError> {
            self.target_port
                .insert(CONFIG_KEY_TARGET_PORT, port, 0)
                .map_err(|e| map_error(MAP_TARGET_PORT, e))
        }

        fn clear_target_port(&mut self) -> Result<(), PortguardError> {
            match self.target_port.remove(&CONFIG_KEY_TARGET_PORT) {
                Ok(()) | Err(MapError::KeyNotFound) => Ok(()),
                Err(e) => Err(map_error(MAP_TARGET_PORT, e)),
            }
        }

        fn read_target_port(&self) -> Result<Option<u16>, PortguardError> {
            match self.target_port.get(&CONFIG_KEY_TARGET_PORT, 0) {
                Ok(port) => Ok(Some(port)),
                Err(MapError::KeyNotFound) => Ok(None),
                Err(e) => Err(map_error(MAP_TARGET_PORT, e)),
            }
        }

        fn read_stats(&self) -> Result<StatsRecord, PortguardError> {
            let total = self
                .stats
                .get(&STATS_IDX_TOTAL, 0)
                .map_err(|e| map_error(MAP_STATS, e))?;
            let dropped = self
                .stats
                .get(&STATS_IDX_DROPPED, 0)
                .map_err(|e| map_error(MAP_STATS, e))?;
            Ok(StatsRecord { total, dropped })
        }

        fn reset_stats(&mut self) -> Result<(), PortguardError> {
            for idx in [STATS_IDX_TOTAL, STATS_IDX_DROPPED] {
                self.stats
                    .set(idx, 0, 0)
                    .map_err(|e| map_error(MAP_STATS, e))?;
            }
            Ok(())
        }
    }
}
