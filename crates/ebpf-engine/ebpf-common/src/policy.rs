//! 결정 엔진 -- 분류된 패킷 + 설정 스냅샷 → Verdict
//!
//! 두 정책을 제공합니다.
//! - [`PortPolicy`]: 설정된 포트로 향하는 TCP를 드롭하고 total/dropped를 집계
//! - [`ProcessPolicy`]: 포트 범위 휴리스틱으로 "대상 프로세스" 트래픽을 추정하고
//!   허용 포트 하나만 통과시킴 (통계 없음)

use core::net::Ipv4Addr;

use crate::parser::{Classified, PassEarly, TcpOffset, classify};
use crate::store::{ConfigStore, StatsCounter};
use crate::view::FrameBytes;
use crate::{PROCESS_ALLOWED_PORT, PROCESS_PORT_RANGE_END, PROCESS_PORT_RANGE_START};

/// 패킷 판정 결과
///
/// 값은 XDP 액션 코드와 동일합니다. 엔진은 `Drop`과 `Pass`만 생성하며
/// 나머지는 호스트 액션 프로토콜 호환을 위해 예약되어 있습니다.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Aborted = 0,
    Drop = 1,
    Pass = 2,
    Transmit = 3,
    Redirect = 4,
}

impl Verdict {
    /// XDP 프로그램 반환 코드
    #[inline(always)]
    pub const fn as_xdp_action(self) -> u32 {
        self as u32
    }
}

/// 패킷 정책
pub trait Policy {
    /// TCP 헤더 위치 계산 방식
    const TCP_OFFSET: TcpOffset;

    /// 분류된 패킷에 대한 판정을 내립니다.
    fn decide<C, S>(&self, packet: &Classified, config: &C, stats: &S) -> Verdict
    where
        C: ConfigStore + ?Sized,
        S: StatsCounter + ?Sized;
}

/// 정책 A -- 설정 포트 직접 매칭
#[derive(Debug, Clone, Copy, Default)]
pub struct PortPolicy;

impl Policy for PortPolicy {
    const TCP_OFFSET: TcpOffset = TcpOffset::Fixed;

    #[inline(always)]
    fn decide<C, S>(&self, packet: &Classified, config: &C, stats: &S) -> Verdict
    where
        C: ConfigStore + ?Sized,
        S: StatsCounter + ?Sized,
    {
        let target_port = config.target_port();
        stats.increment_total();

        if packet.dest_port == target_port {
            stats.increment_dropped();
            return Verdict::Drop;
        }
        Verdict::Pass
    }
}

/// 프로세스 식별 휴리스틱 -- 목적지 포트가 닫힌 구간 안에 있으면 대상 프로세스로 간주
///
/// 실제 소켓/PID 귀속이 아닌 자리표시자입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHeuristic {
    pub low: u16,
    pub high: u16,
}

impl ProcessHeuristic {
    /// `[4000, 5000]`
    pub const MONITORED: Self = Self {
        low: PROCESS_PORT_RANGE_START,
        high: PROCESS_PORT_RANGE_END,
    };

    #[inline(always)]
    pub const fn matches(&self, dest_port: u16) -> bool {
        dest_port >= self.low && dest_port <= self.high
    }
}

/// 정책 B -- 프로세스 휴리스틱 범위 내에서 허용 포트 하나만 통과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessPolicy {
    /// 대상 프로세스에 허용되는 유일한 포트
    pub allowed_port: u16,
    /// 대상 프로세스 판별 휴리스틱
    pub heuristic: ProcessHeuristic,
    /// 정책 적용 범위 (이 주소로 향하는 트래픽만 검사)
    pub scope: Ipv4Addr,
}

impl ProcessPolicy {
    /// 허용 포트 4040, 범위 `[4000, 5000]`, 범위 주소 127.0.0.1
    pub const FIXED: Self = Self {
        allowed_port: PROCESS_ALLOWED_PORT,
        heuristic: ProcessHeuristic::MONITORED,
        scope: Ipv4Addr::LOCALHOST,
    };
}

impl Default for ProcessPolicy {
    fn default() -> Self {
        Self::FIXED
    }
}

impl Policy for ProcessPolicy {
    const TCP_OFFSET: TcpOffset = TcpOffset::HeaderLength;

    #[inline(always)]
    fn decide<C, S>(&self, packet: &Classified, _config: &C, _stats: &S) -> Verdict
    where
        C: ConfigStore + ?Sized,
        S: StatsCounter + ?Sized,
    {
        if packet.dest_addr != self.scope {
            return Verdict::Pass;
        }
        if !self.heuristic.matches(packet.dest_port) {
            return Verdict::Pass;
        }
        if packet.dest_port == self.allowed_port {
            return Verdict::Pass;
        }
        Verdict::Drop
    }
}

/// 프레임 하나를 분류하고 정책을 적용합니다.
///
/// 분류 단계에서 끝나면 사유를 `Err`로 돌려주며, 이때 카운터는 변경되지 않습니다.
#[inline(always)]
pub fn try_evaluate<F, P, C, S>(
    frame: &F,
    policy: &P,
    config: &C,
    stats: &S,
) -> Result<Verdict, PassEarly>
where
    F: FrameBytes + ?Sized,
    P: Policy,
    C: ConfigStore + ?Sized,
    S: StatsCounter + ?Sized,
{
    let packet = classify(frame, P::TCP_OFFSET)?;
    Ok(policy.decide(&packet, config, stats))
}

/// fail-open 판정 -- 분류 실패는 항상 `Pass`
#[inline(always)]
pub fn evaluate<F, P, C, S>(frame: &F, policy: &P, config: &C, stats: &S) -> Verdict
where
    F: FrameBytes + ?Sized,
    P: Policy,
    C: ConfigStore + ?Sized,
    S: StatsCounter + ?Sized,
{
    try_evaluate(frame, policy, config, stats).unwrap_or(Verdict::Pass)
}
