//! 헤더 파서 -- Ethernet → IPv4 → TCP 고정 순서 분류
//!
//! ```text
//! ExpectEthernet ──▶ ExpectIPv4 ──▶ ExpectTCP ──▶ Classified
//!       │                 │              │
//!       └─────────────────┴──────────────┴──▶ PassEarly(reason)
//! ```
//!
//! 각 전이는 정적으로 정해진 바이트 수만 소비하며 반복이나 재귀가 없습니다.
//! 길이 0을 포함한 모든 입력은 정확히 하나의 종료 상태에 도달합니다.

use core::net::Ipv4Addr;

use crate::view::{FrameBytes, PacketView};
use crate::{ETH_HDR_LEN, ETH_P_IPV4, IPV4_HDR_LEN, PROTO_TCP, TCP_PORTS_LEN};

/// 분류 전에 통과(Pass)로 끝나는 사유
///
/// 모두 fail-open으로 처리되며 에러로 전파되지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PassEarly {
    /// 현재 파싱 중인 헤더에 필요한 바이트가 부족함
    #[error("frame truncated")]
    Truncated,
    /// Ethernet 타입이 IPv4(0x0800)가 아님
    #[error("ethertype is not IPv4")]
    NotIpv4,
    /// IP 프로토콜이 TCP(6)가 아님
    #[error("ip protocol is not TCP")]
    NotTcp,
}

/// TCP 헤더 위치 계산 방식
///
/// 포트 정책은 IP 헤더를 항상 20바이트로 간주하고,
/// 프로세스 정책은 IHL 필드(`IHL * 4`)를 따릅니다.
/// IP 옵션이 있는 패킷(IHL > 5)에서 두 정책의 해석이 달라지며, 이 차이는 유지됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpOffset {
    /// IP 헤더 시작 + 20
    Fixed,
    /// IP 헤더 시작 + IHL * 4
    HeaderLength,
}

/// 구조 검증을 통과하고 정책 평가에 필요한 필드를 추출한 패킷
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classified {
    /// Ethernet 타입 (호스트 바이트 오더)
    pub ether_type: u16,
    /// IP 프로토콜 번호
    pub protocol: u8,
    /// TCP 출발지 포트 (호스트 바이트 오더)
    pub src_port: u16,
    /// TCP 목적지 포트 (호스트 바이트 오더)
    pub dest_port: u16,
    /// IPv4 목적지 주소
    pub dest_addr: Ipv4Addr,
}

/// 프레임을 분류합니다.
///
/// 필드 접근은 모두 [`PacketView::take`]를 거치므로 범위 검사가 선행됩니다.
/// IHL 값 자체는 검증하지 않습니다 (IHL < 5이면 TCP 포트를 IP 헤더 내부에서 읽음).
#[inline(always)]
pub fn classify<F: FrameBytes + ?Sized>(
    frame: &F,
    tcp_offset: TcpOffset,
) -> Result<Classified, PassEarly> {
    let mut view = PacketView::new(frame);

    // ExpectEthernet
    let eth: [u8; ETH_HDR_LEN] = view.take()?;
    let ether_type = u16::from_be_bytes([eth[12], eth[13]]);
    if ether_type != ETH_P_IPV4 {
        return Err(PassEarly::NotIpv4);
    }

    // ExpectIPv4
    let ip_start = view.cursor();
    let ip: [u8; IPV4_HDR_LEN] = view.take()?;
    let protocol = ip[9];
    if protocol != PROTO_TCP {
        return Err(PassEarly::NotTcp);
    }
    let dest_addr = Ipv4Addr::new(ip[16], ip[17], ip[18], ip[19]);
    let ip_len = match tcp_offset {
        TcpOffset::Fixed => IPV4_HDR_LEN,
        TcpOffset::HeaderLength => usize::from(ip[0] & 0x0f) * 4,
    };
    view.seek(ip_start + ip_len);

    // ExpectTCP -- 목적지 포트까지 앞 4바이트만 필요
    let tcp: [u8; TCP_PORTS_LEN] = view.take()?;

    Ok(Classified {
        ether_type,
        protocol,
        src_port: u16::from_be_bytes([tcp[0], tcp[1]]),
        dest_port: u16::from_be_bytes([tcp[2], tcp[3]]),
        dest_addr,
    })
}
