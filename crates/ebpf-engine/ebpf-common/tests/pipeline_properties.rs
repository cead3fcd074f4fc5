//! 통합 테스트 -- 프레임 바이트 → Verdict 전체 파이프라인 검증
//!
//! 커널 프로그램과 동일한 `evaluate` 경로를 atomic 저장소로 구동하여
//! fail-open, 카운터 갱신, 핫 리로드, 정책 간 오프셋 차이를 확인합니다.

use std::net::Ipv4Addr;
use std::thread;

use portguard_ebpf_common::{
    AtomicConfigStore, AtomicStatsCounter, ConfigStore, PassEarly, PortPolicy, ProcessPolicy,
    StatsCounter, StatsRecord, StatsSlot, Verdict, evaluate, try_evaluate,
};

/// 테스트용 프레임 빌더
struct FrameBuilder {
    ether_type: u16,
    ihl: u8,
    protocol: u8,
    dest_addr: Ipv4Addr,
    src_port: u16,
    dest_port: u16,
}

impl FrameBuilder {
    fn tcp(dest_addr: Ipv4Addr, dest_port: u16) -> Self {
        Self {
            ether_type: 0x0800,
            ihl: 5,
            protocol: 6,
            dest_addr,
            src_port: 43210,
            dest_port,
        }
    }

    fn ether_type(mut self, ether_type: u16) -> Self {
        self.ether_type = ether_type;
        self
    }

    fn protocol(mut self, protocol: u8) -> Self {
        self.protocol = protocol;
        self
    }

    fn ihl(mut self, ihl: u8) -> Self {
        self.ihl = ihl;
        self
    }

    /// Ethernet + IPv4(옵션 포함) + TCP 20바이트
    fn build(&self) -> Vec<u8> {
        let ip_len = usize::from(self.ihl) * 4;
        let mut buf = vec![0u8; 14 + ip_len.max(20) + 20];

        buf[0..6].copy_from_slice(&[0xff; 6]);
        buf[6..12].copy_from_slice(&[0x02, 0, 0, 0, 0, 1]);
        buf[12..14].copy_from_slice(&self.ether_type.to_be_bytes());

        let ip = &mut buf[14..];
        ip[0] = 0x40 | (self.ihl & 0x0f);
        ip[8] = 64;
        ip[9] = self.protocol;
        ip[12..16].copy_from_slice(&[127, 0, 0, 1]);
        ip[16..20].copy_from_slice(&self.dest_addr.octets());

        let tcp = 14 + ip_len;
        buf[tcp..tcp + 2].copy_from_slice(&self.src_port.to_be_bytes());
        buf[tcp + 2..tcp + 4].copy_from_slice(&self.dest_port.to_be_bytes());
        buf[tcp + 12] = 0x50;
        buf[tcp + 13] = 0x02; // SYN
        buf
    }
}

fn loopback(port: u16) -> Vec<u8> {
    FrameBuilder::tcp(Ipv4Addr::LOCALHOST, port).build()
}

// =============================================================================
// Fail-open
// =============================================================================

#[test]
fn test_frames_shorter_than_ethernet_pass_without_counting() {
    let config = AtomicConfigStore::new();
    let stats = AtomicStatsCounter::new();
    let full = loopback(4040);

    for len in 0..14 {
        assert_eq!(evaluate(&full[..len], &PortPolicy, &config, &stats), Verdict::Pass);
        assert_eq!(
            evaluate(&full[..len], &ProcessPolicy::FIXED, &config, &stats),
            Verdict::Pass
        );
    }
    assert_eq!(stats.snapshot(), StatsRecord::default());
}

#[test]
fn test_truncated_ip_or_tcp_header_passes() {
    let config = AtomicConfigStore::new();
    let stats = AtomicStatsCounter::new();
    let full = loopback(4040);

    for len in 14..38 {
        assert_eq!(
            try_evaluate(&full[..len], &PortPolicy, &config, &stats),
            Err(PassEarly::Truncated),
            "len {len}"
        );
    }
    assert_eq!(stats.snapshot().total, 0);
}

#[test]
fn test_non_ipv4_passes() {
    let config = AtomicConfigStore::new();
    let stats = AtomicStatsCounter::new();

    for ether_type in [0x86dd, 0x0806, 0x8100] {
        let frame = FrameBuilder::tcp(Ipv4Addr::LOCALHOST, 4040)
            .ether_type(ether_type)
            .build();
        assert_eq!(evaluate(&frame[..], &PortPolicy, &config, &stats), Verdict::Pass);
        assert_eq!(
            evaluate(&frame[..], &ProcessPolicy::FIXED, &config, &stats),
            Verdict::Pass
        );
    }
    assert_eq!(stats.snapshot(), StatsRecord::default());
}

#[test]
fn test_non_tcp_passes() {
    let config = AtomicConfigStore::new();
    let stats = AtomicStatsCounter::new();

    for protocol in [1u8, 17, 47] {
        let frame = FrameBuilder::tcp(Ipv4Addr::LOCALHOST, 4041)
            .protocol(protocol)
            .build();
        assert_eq!(
            try_evaluate(&frame[..], &PortPolicy, &config, &stats),
            Err(PassEarly::NotTcp)
        );
        assert_eq!(
            evaluate(&frame[..], &ProcessPolicy::FIXED, &config, &stats),
            Verdict::Pass
        );
    }
    assert_eq!(stats.snapshot(), StatsRecord::default());
}

// =============================================================================
// 포트 정책
// =============================================================================

#[test]
fn test_port_policy_default_port_is_dropped() {
    let config = AtomicConfigStore::new();
    let stats = AtomicStatsCounter::new();

    let verdict = evaluate(&loopback(4040)[..], &PortPolicy, &config, &stats);

    assert_eq!(verdict, Verdict::Drop);
    assert_eq!(stats.snapshot(), StatsRecord { total: 1, dropped: 1 });
}

#[test]
fn test_port_policy_other_port_passes() {
    let config = AtomicConfigStore::new();
    let stats = AtomicStatsCounter::new();

    let verdict = evaluate(&loopback(8080)[..], &PortPolicy, &config, &stats);

    assert_eq!(verdict, Verdict::Pass);
    assert_eq!(stats.snapshot(), StatsRecord { total: 1, dropped: 0 });
}

#[test]
fn test_port_policy_total_counts_every_classified_packet() {
    let config = AtomicConfigStore::new();
    let stats = AtomicStatsCounter::new();
    let short = loopback(4040);

    let ports = [4040u16, 80, 443, 4040, 22];
    for port in ports {
        evaluate(&loopback(port)[..], &PortPolicy, &config, &stats);
    }
    // early-pass 패킷은 total에 포함되지 않음
    evaluate(&short[..20], &PortPolicy, &config, &stats);

    assert_eq!(stats.snapshot(), StatsRecord { total: 5, dropped: 2 });
}

#[test]
fn test_port_policy_hot_reload() {
    let config = AtomicConfigStore::new();
    let stats = AtomicStatsCounter::new();
    assert_eq!(evaluate(&loopback(4040)[..], &PortPolicy, &config, &stats), Verdict::Drop);

    config.set(9090);

    assert_eq!(evaluate(&loopback(9090)[..], &PortPolicy, &config, &stats), Verdict::Drop);
    assert_eq!(evaluate(&loopback(4040)[..], &PortPolicy, &config, &stats), Verdict::Pass);

    config.clear();
    assert_eq!(config.target_port(), 4040);
    assert_eq!(evaluate(&loopback(4040)[..], &PortPolicy, &config, &stats), Verdict::Drop);
    assert_eq!(stats.snapshot(), StatsRecord { total: 4, dropped: 3 });
}

#[test]
fn test_port_policy_uses_fixed_tcp_offset() {
    // IHL=6이면 Fixed 오프셋은 IP 옵션 4바이트를 포트로 읽는다
    let mut frame = FrameBuilder::tcp(Ipv4Addr::LOCALHOST, 8080).ihl(6).build();
    frame[34..38].copy_from_slice(&[0x00, 0x00, 0x0f, 0xc8]); // 4040
    let config = AtomicConfigStore::new();
    let stats = AtomicStatsCounter::new();

    assert_eq!(evaluate(&frame[..], &PortPolicy, &config, &stats), Verdict::Drop);
}

// =============================================================================
// 프로세스 정책
// =============================================================================

#[test]
fn test_process_policy_properties() {
    let config = AtomicConfigStore::new();
    let stats = AtomicStatsCounter::new();
    let policy = ProcessPolicy::FIXED;

    let cases = [
        (Ipv4Addr::LOCALHOST, 4040, Verdict::Pass),
        (Ipv4Addr::LOCALHOST, 4041, Verdict::Drop),
        (Ipv4Addr::new(10, 0, 0, 1), 4041, Verdict::Pass),
        (Ipv4Addr::LOCALHOST, 3000, Verdict::Pass),
    ];

    for (addr, port, expected) in cases {
        let frame = FrameBuilder::tcp(addr, port).build();
        assert_eq!(evaluate(&frame[..], &policy, &config, &stats), expected, "{addr}:{port}");
    }
    assert_eq!(stats.snapshot(), StatsRecord::default());
}

#[test]
fn test_process_policy_honours_ip_options() {
    let frame = FrameBuilder::tcp(Ipv4Addr::LOCALHOST, 4500).ihl(7).build();
    let config = AtomicConfigStore::new();

    let verdict = evaluate(&frame[..], &ProcessPolicy::FIXED, &config, &AtomicStatsCounter::new());

    assert_eq!(verdict, Verdict::Drop);
}

#[test]
fn test_process_policy_is_not_affected_by_target_port() {
    let config = AtomicConfigStore::with_port(4041);
    let frame = loopback(4041);

    let verdict = evaluate(&frame[..], &ProcessPolicy::FIXED, &config, &AtomicStatsCounter::new());

    assert_eq!(verdict, Verdict::Drop);
}

// =============================================================================
// 멱등성 / 동시성
// =============================================================================

#[test]
fn test_identical_frames_yield_identical_verdicts() {
    let config = AtomicConfigStore::with_port(22);
    let stats = AtomicStatsCounter::new();

    let frames = [
        loopback(22),
        loopback(4040),
        FrameBuilder::tcp(Ipv4Addr::new(192, 168, 0, 9), 4100).build(),
        FrameBuilder::tcp(Ipv4Addr::LOCALHOST, 22).protocol(17).build(),
        loopback(22)[..30].to_vec(),
    ];

    for frame in &frames {
        let first = (
            evaluate(&frame[..], &PortPolicy, &config, &stats),
            evaluate(&frame[..], &ProcessPolicy::FIXED, &config, &stats),
        );
        let second = (
            evaluate(&frame[..], &PortPolicy, &config, &stats),
            evaluate(&frame[..], &ProcessPolicy::FIXED, &config, &stats),
        );
        assert_eq!(first, second);
    }
}

#[test]
fn test_concurrent_increments_are_not_lost() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 10_000;

    let config = AtomicConfigStore::new();
    let stats = AtomicStatsCounter::new();
    let drop_frame = loopback(4040);
    let pass_frame = loopback(8080);

    thread::scope(|s| {
        for i in 0..THREADS {
            let (config, stats) = (&config, &stats);
            let frame = if i % 2 == 0 { &drop_frame } else { &pass_frame };
            s.spawn(move || {
                for _ in 0..PER_THREAD {
                    evaluate(&frame[..], &PortPolicy, config, stats);
                }
            });
        }
    });

    let snapshot = stats.snapshot();
    assert_eq!(snapshot.total, (THREADS * PER_THREAD) as u64);
    assert_eq!(snapshot.dropped, (THREADS / 2 * PER_THREAD) as u64);
}

#[test]
fn test_custom_counter_sees_slots_in_order() {
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<StatsSlot>>);

    impl StatsCounter for Recorder {
        fn increment(&self, slot: StatsSlot) {
            if let Ok(mut slots) = self.0.lock() {
                slots.push(slot);
            }
        }
    }

    let recorder = Recorder::default();
    evaluate(&loopback(4040)[..], &PortPolicy, &AtomicConfigStore::new(), &recorder);

    let slots = recorder.0.into_inner().unwrap_or_default();
    assert_eq!(slots, vec![StatsSlot::Total, StatsSlot::Dropped]);
}
