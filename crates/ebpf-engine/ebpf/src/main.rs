#![no_std]
#![no_main]

use core::sync::atomic::{AtomicU64, Ordering};

use aya_ebpf::{
    bindings::xdp_action,
    macros::{map, xdp},
    maps::{Array, HashMap},
    programs::XdpContext,
};
use aya_log_ebpf::debug;
use portguard_ebpf_common::{
    CONFIG_KEY_TARGET_PORT, ConfigStore, FrameBytes, NoStats, PassEarly, Policy, PortPolicy,
    ProcessPolicy, STATS_MAX_ENTRIES, StatsCounter, StatsSlot, Verdict, classify,
};

// =============================================================================
// 맵
// =============================================================================

/// 차단 포트 (키 0 하나). 비어 있으면 기본 포트 사용
#[map]
static TARGET_PORT: HashMap<u32, u16> = HashMap::pinned(1, 0);

/// 0: 전체 패킷, 1: 드롭 패킷
#[map]
static STATS: Array<u64> = Array::pinned(STATS_MAX_ENTRIES, 0);

// =============================================================================
// 파이프라인 바인딩
// =============================================================================

/// `XdpContext`의 [data, data_end) 구간
struct XdpFrame<'a> {
    ctx: &'a XdpContext,
}

impl FrameBytes for XdpFrame<'_> {
    #[inline(always)]
    fn load<const N: usize>(&self, offset: usize) -> Option<[u8; N]> {
        let start = self.ctx.data();
        let end = self.ctx.data_end();
        if start + offset + N > end {
            return None;
        }
        // SAFETY: 위에서 [start + offset, start + offset + N) 구간이 프레임 안에 있음을 확인했습니다.
        Some(unsafe { core::ptr::read_unaligned((start + offset) as *const [u8; N]) })
    }
}

/// `TARGET_PORT` 맵 기반 설정
struct MapConfig;

impl ConfigStore for MapConfig {
    #[inline(always)]
    fn lookup_target_port(&self) -> Option<u16> {
        // SAFETY: 값은 u16 복사본으로만 사용하며 참조를 보관하지 않습니다.
        unsafe { TARGET_PORT.get(&CONFIG_KEY_TARGET_PORT).copied() }
    }
}

/// `STATS` 맵 기반 카운터
struct MapStats;

impl StatsCounter for MapStats {
    #[inline(always)]
    fn increment(&self, slot: StatsSlot) {
        if let Some(ptr) = STATS.get_ptr_mut(slot.index()) {
            // SAFETY: Array 슬롯은 8바이트 정렬된 u64이며 맵 수명 동안 유효합니다.
            unsafe { AtomicU64::from_ptr(ptr) }.fetch_add(1, Ordering::Relaxed);
        }
    }
}

// =============================================================================
// 프로그램
// =============================================================================

/// 포트 정책 XDP 프로그램
///
/// `TARGET_PORT`(기본 4040)로 향하는 TCP 패킷을 드롭합니다.
#[xdp]
pub fn port_filter(ctx: XdpContext) -> u32 {
    match try_port_filter(&ctx) {
        Ok(ret) => ret,
        Err(_) => xdp_action::XDP_PASS,
    }
}

fn try_port_filter(ctx: &XdpContext) -> Result<u32, PassEarly> {
    let packet = classify(&XdpFrame { ctx }, PortPolicy::TCP_OFFSET)?;
    let verdict = PortPolicy.decide(&packet, &MapConfig, &MapStats);
    if verdict == Verdict::Drop {
        debug!(ctx, "port_filter: drop tcp dport {}", packet.dest_port);
    }
    Ok(verdict.as_xdp_action())
}

/// 프로세스 정책 XDP 프로그램
///
/// 127.0.0.1로 향하는 4000-5000 포트 TCP 중 4040만 통과시킵니다.
#[xdp]
pub fn process_filter(ctx: XdpContext) -> u32 {
    match try_process_filter(&ctx) {
        Ok(ret) => ret,
        Err(_) => xdp_action::XDP_PASS,
    }
}

fn try_process_filter(ctx: &XdpContext) -> Result<u32, PassEarly> {
    let policy = ProcessPolicy::FIXED;
    let packet = classify(&XdpFrame { ctx }, ProcessPolicy::TCP_OFFSET)?;
    let verdict = policy.decide(&packet, &MapConfig, &NoStats);
    if verdict == Verdict::Drop {
        debug!(ctx, "process_filter: drop tcp dport {}", packet.dest_port);
    }
    Ok(verdict.as_xdp_action())
}

#[cfg(not(test))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}

#[unsafe(link_section = "license")]
#[unsafe(no_mangle)]
static LICENSE: [u8; 4] = *b"GPL\0";
