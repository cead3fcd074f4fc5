#![no_main]

use libfuzzer_sys::fuzz_target;

use portguard_ebpf_common::{
    classify, evaluate, AtomicConfigStore, AtomicStatsCounter, PortPolicy, ProcessPolicy,
    StatsRecord, TcpOffset, Verdict, ETH_HDR_LEN,
};

// 임의 바이트에 대해 분류/판정이 패닉 없이 끝나야 함
fuzz_target!(|data: &[u8]| {
    let _ = classify(data, TcpOffset::Fixed);
    let _ = classify(data, TcpOffset::HeaderLength);

    let config = AtomicConfigStore::new();
    let stats = AtomicStatsCounter::new();

    let port_verdict = evaluate(data, &PortPolicy, &config, &stats);
    let process_verdict = evaluate(data, &ProcessPolicy::FIXED, &config, &stats);

    if data.len() < ETH_HDR_LEN {
        assert_eq!(port_verdict, Verdict::Pass);
        assert_eq!(process_verdict, Verdict::Pass);
        assert_eq!(stats.snapshot(), StatsRecord::default());
    }

    let counted = stats.snapshot();
    assert!(counted.dropped <= counted.total);
    assert!(counted.total <= 1);
});
