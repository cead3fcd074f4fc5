#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use portguard_ebpf_common::{
    classify, try_evaluate, AtomicConfigStore, AtomicStatsCounter, ConfigStore, PortPolicy,
    TcpOffset, Verdict,
};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    /// `None`이면 TARGET_PORT 엔트리 없음
    target_port: Option<u16>,
    frame: Vec<u8>,
}

// 포트 정책: 분류에 성공하면 dest_port == 유효 포트일 때만 Drop
fuzz_target!(|input: FuzzInput| {
    let config = match input.target_port {
        Some(port) => AtomicConfigStore::with_port(port),
        None => AtomicConfigStore::new(),
    };
    let stats = AtomicStatsCounter::new();

    let verdict = try_evaluate(&input.frame[..], &PortPolicy, &config, &stats);
    let classified = classify(&input.frame[..], TcpOffset::Fixed);

    match (verdict, classified) {
        (Ok(verdict), Ok(packet)) => {
            let expected = if packet.dest_port == config.target_port() {
                Verdict::Drop
            } else {
                Verdict::Pass
            };
            assert_eq!(verdict, expected);

            let counted = stats.snapshot();
            assert_eq!(counted.total, 1);
            assert_eq!(counted.dropped, u64::from(verdict == Verdict::Drop));
        }
        (Err(a), Err(b)) => assert_eq!(a, b),
        (verdict, classified) => {
            panic!("evaluate and classify disagree: {verdict:?} vs {classified:?}")
        }
    }
});
