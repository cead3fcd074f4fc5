//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `portguard_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(portguard_core::metrics::CONFIG_RELOADS_TOTAL).increment(1);
//! ```

// ─── 필터 메트릭 ────────────────────────────────────────────────────

/// 분류된 전체 TCP 패킷 수 (counter, STATS[0])
pub const PACKETS_TOTAL: &str = "portguard_packets_total";

/// 드롭된 패킷 수 (counter, STATS[1])
pub const PACKETS_DROPPED_TOTAL: &str = "portguard_packets_dropped_total";

/// 통과한 패킷 수 (counter, total - dropped)
pub const PACKETS_PASSED_TOTAL: &str = "portguard_packets_passed_total";

/// 초당 분류 패킷 수 (gauge)
pub const PACKETS_PER_SECOND: &str = "portguard_packets_per_second";

/// 초당 드롭 패킷 수 (gauge)
pub const DROPS_PER_SECOND: &str = "portguard_drops_per_second";

/// 현재 차단 포트 (gauge)
pub const TARGET_PORT: &str = "portguard_target_port";

// ─── 데몬 메트릭 ────────────────────────────────────────────────────

/// SIGHUP 설정 리로드 횟수 (counter)
pub const CONFIG_RELOADS_TOTAL: &str = "portguard_config_reloads_total";

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 이 함수는 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `portguard-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        PACKETS_TOTAL,
        "Total number of TCP packets classified by the XDP filter"
    );
    describe_counter!(
        PACKETS_DROPPED_TOTAL,
        "Total number of packets dropped (XDP_DROP)"
    );
    describe_counter!(
        PACKETS_PASSED_TOTAL,
        "Total number of classified packets passed (XDP_PASS)"
    );
    describe_gauge!(
        PACKETS_PER_SECOND,
        "Classified packet rate over the last polling interval"
    );
    describe_gauge!(
        DROPS_PER_SECOND,
        "Dropped packet rate over the last polling interval"
    );
    describe_gauge!(TARGET_PORT, "TCP destination port currently blocked");
    describe_counter!(
        CONFIG_RELOADS_TOTAL,
        "Number of configuration reloads triggered by SIGHUP"
    );
}
