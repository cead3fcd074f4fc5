//! 분류/판정 파이프라인 벤치마크
//!
//! 패킷당 경로(classify + decide)의 호스트 측 비용을 측정합니다.

use std::net::Ipv4Addr;

use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use portguard_ebpf_common::{
    AtomicConfigStore, AtomicStatsCounter, PortPolicy, ProcessPolicy, TcpOffset, classify,
    evaluate,
};

fn tcp_frame(dest_addr: Ipv4Addr, dest_port: u16, ihl: u8) -> Vec<u8> {
    let ip_len = usize::from(ihl) * 4;
    let mut buf = vec![0u8; 14 + ip_len + 20];
    buf[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
    buf[14] = 0x40 | ihl;
    buf[14 + 9] = 6;
    buf[14 + 16..14 + 20].copy_from_slice(&dest_addr.octets());
    let tcp = 14 + ip_len;
    buf[tcp + 2..tcp + 4].copy_from_slice(&dest_port.to_be_bytes());
    buf
}

fn bench_classify(c: &mut Criterion) {
    let plain = tcp_frame(Ipv4Addr::LOCALHOST, 4040, 5);
    let with_options = tcp_frame(Ipv4Addr::LOCALHOST, 4040, 15);
    let runt = [0u8; 10];

    let mut group = c.benchmark_group("classify");
    group.throughput(Throughput::Elements(1));

    group.bench_function("tcp_fixed_offset", |b| {
        b.iter(|| classify(black_box(&plain[..]), TcpOffset::Fixed))
    });

    group.bench_function("tcp_ihl_offset_max_options", |b| {
        b.iter(|| classify(black_box(&with_options[..]), TcpOffset::HeaderLength))
    });

    group.bench_function("runt_frame", |b| {
        b.iter(|| classify(black_box(&runt[..]), TcpOffset::Fixed))
    });

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let config = AtomicConfigStore::new();
    let stats = AtomicStatsCounter::new();
    let drop_frame = tcp_frame(Ipv4Addr::LOCALHOST, 4040, 5);
    let pass_frame = tcp_frame(Ipv4Addr::new(10, 0, 0, 1), 443, 5);

    let mut group = c.benchmark_group("evaluate");
    group.throughput(Throughput::Elements(1));

    group.bench_function("port_policy_drop", |b| {
        b.iter(|| evaluate(black_box(&drop_frame[..]), &PortPolicy, &config, &stats))
    });

    group.bench_function("port_policy_pass", |b| {
        b.iter(|| evaluate(black_box(&pass_frame[..]), &PortPolicy, &config, &stats))
    });

    group.bench_function("process_policy_loopback", |b| {
        b.iter(|| {
            evaluate(
                black_box(&drop_frame[..]),
                &ProcessPolicy::FIXED,
                &config,
                &stats,
            )
        })
    });

    group.finish();
}

criterion_group!(benches, bench_classify, bench_evaluate);
criterion_main!(benches);
