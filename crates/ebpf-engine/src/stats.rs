//! 통계 수집 -- STATS Array 기반 패킷 통계
//!
//! [`FilterStats`]는 커널 `STATS` 맵에서 읽은 누적 카운터(total, dropped)를
//! 통과 수, 드롭 비율, 초당 처리량으로 가공합니다.
//! 데몬이 주기적으로 폴링하여 업데이트하고 로그/메트릭으로 노출합니다.
//!
//! # 데이터 흐름
//! ```text
//! STATS Array (kernel) ──read_stats──▶ StatsRecord ──update──▶ FilterStats
//!                                      (total, dropped)         (rate 계산)
//! ```

use std::time::Instant;

use portguard_core::metrics as m;
use portguard_ebpf_common::StatsRecord;
use serde::Serialize;

/// 필터 트래픽 통계 (누적 + 비율)
///
/// `Serialize`를 구현하여 CLI의 JSON 출력에도 사용됩니다.
///
/// # Rate 계산
/// `update()`를 호출할 때마다 이전 스냅샷과의 차이(delta)를 시간으로 나누어
/// pps, drops_per_sec를 계산합니다. 첫 번째 호출에서는 rate가 0입니다.
#[derive(Debug, Clone, Serialize)]
pub struct FilterStats {
    /// 분류된 전체 TCP 패킷 수 (누적)
    pub total: u64,
    /// 드롭된 패킷 수 (누적)
    pub dropped: u64,
    /// 통과한 패킷 수 (total - dropped)
    pub passed: u64,
    /// 드롭 비율 (0.0 ~ 1.0)
    pub drop_ratio: f64,
    /// 초당 분류 패킷 수
    pub pps: f64,
    /// 초당 드롭 패킷 수
    pub drops_per_sec: f64,
    /// 마지막 업데이트 시각 (rate 계산용, 직렬화 제외)
    #[serde(skip)]
    last_poll: Option<Instant>,
    /// 이전 폴링의 원시 값 (delta 계산용, 직렬화 제외)
    #[serde(skip)]
    prev_raw: Option<StatsRecord>,
}

impl FilterStats {
    /// 제로 초기화된 통계를 생성합니다.
    pub fn new() -> Self {
        Self {
            total: 0,
            dropped: 0,
            passed: 0,
            drop_ratio: 0.0,
            pps: 0.0,
            drops_per_sec: 0.0,
            last_poll: None,
            prev_raw: None,
        }
    }

    /// 한 번의 맵 읽기 결과로 통계를 만듭니다 (rate 없음).
    pub fn from_record(raw: StatsRecord) -> Self {
        let mut stats = Self::new();
        stats.set_cumulative(&raw);
        stats
    }

    /// 원시 스냅샷으로부터 통계를 업데이트하고 메트릭을 갱신합니다.
    pub fn update(&mut self, raw: StatsRecord) {
        self.update_at(raw, Instant::now());

        metrics::counter!(m::PACKETS_TOTAL).absolute(self.total);
        metrics::counter!(m::PACKETS_DROPPED_TOTAL).absolute(self.dropped);
        metrics::counter!(m::PACKETS_PASSED_TOTAL).absolute(self.passed);
        metrics::gauge!(m::PACKETS_PER_SECOND).set(self.pps);
        metrics::gauge!(m::DROPS_PER_SECOND).set(self.drops_per_sec);
    }

    fn update_at(&mut self, raw: StatsRecord, now: Instant) {
        self.set_cumulative(&raw);

        if let (Some(prev), Some(last_time)) = (&self.prev_raw, self.last_poll) {
            let elapsed = now.duration_since(last_time).as_secs_f64();
            if elapsed > 0.0 {
                let delta_total = raw.total.saturating_sub(prev.total);
                let delta_dropped = raw.dropped.saturating_sub(prev.dropped);

                // 폴링 간격 동안의 delta는 실용적으로 2^53 미만
                #[allow(clippy::cast_precision_loss)]
                {
                    self.pps = delta_total as f64 / elapsed;
                    self.drops_per_sec = delta_dropped as f64 / elapsed;
                }
            }
        }

        self.prev_raw = Some(raw);
        self.last_poll = Some(now);
    }

    /// 통계를 초기화합니다.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// 누적값만 설정합니다 (rate는 0).
    fn set_cumulative(&mut self, raw: &StatsRecord) {
        self.total = raw.total;
        self.dropped = raw.dropped;
        self.passed = raw.total.saturating_sub(raw.dropped);
        self.drop_ratio = if raw.total == 0 {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                raw.dropped.min(raw.total) as f64 / raw.total as f64
            }
        };
        self.pps = 0.0;
        self.drops_per_sec = 0.0;
    }
}

impl Default for FilterStats {
    fn default() -> Self {
        Self::new()
    }
}
