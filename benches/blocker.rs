//! Benchmarks for the block decision.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use groupwall::blocklist::{ListGroupStore, ListSnapshot, SharedLists};
use groupwall::config::WhitelistOnlyMode;
use groupwall::dns::{Blocker, ClientGroups};

fn generate_list(prefix: &str, size: usize) -> Vec<String> {
    (0..size).map(|i| format!("{prefix}{i}.example.com")).collect()
}

fn create_blocker(size: usize) -> Blocker {
    let lists = SharedLists::new(ListSnapshot {
        blacklists: ListGroupStore::new([
            ("ads", generate_list("ads", size)),
            ("malware", generate_list("malware", size)),
        ]),
        whitelists: ListGroupStore::new([("ads", generate_list("ads", size / 10))]),
    });
    Blocker::new(lists, Vec::<String>::new(), WhitelistOnlyMode::Passthrough)
}

fn bench_is_blocked(c: &mut Criterion) {
    let mut group = c.benchmark_group("blocker_lookup");
    let groups = vec!["ads".to_string(), "malware".to_string()];

    for size in &[100, 10_000, 100_000] {
        let blocker = create_blocker(*size);

        // Blacklisted and not whitelisted
        let hit = format!("malware{}.example.com.", size - 1);
        group.bench_with_input(BenchmarkId::new("hit", size), &hit, |b, domain| {
            b.iter(|| blocker.is_blocked(black_box(&groups), black_box(domain)));
        });

        // Blacklisted but whitelisted
        group.bench_with_input(
            BenchmarkId::new("whitelisted", size),
            &"ads0.example.com.",
            |b, domain| {
                b.iter(|| blocker.is_blocked(black_box(&groups), black_box(domain)));
            },
        );

        // Not listed anywhere
        group.bench_with_input(BenchmarkId::new("miss", size), &"google.com.", |b, domain| {
            b.iter(|| blocker.is_blocked(black_box(&groups), black_box(domain)));
        });
    }

    group.finish();
}

fn bench_group_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_resolution");

    for size in &[10, 1000] {
        let table = (0..*size)
            .map(|i| (format!("client{i}"), vec![format!("gr{}", i % 5)]))
            .chain([("default".to_string(), vec!["gr0".to_string()])])
            .collect();
        let client_groups = ClientGroups::new(table);
        let names = vec!["unknown".to_string(), format!("client{}", size - 1)];
        let unknown = vec!["unknown".to_string()];
        let ip = "192.168.178.1".parse().unwrap();

        group.bench_with_input(BenchmarkId::new("by_name", size), &names, |b, names| {
            b.iter(|| client_groups.groups_for(black_box(names), ip));
        });
        group.bench_with_input(BenchmarkId::new("default", size), &unknown, |b, names| {
            b.iter(|| client_groups.groups_for(black_box(names), ip));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_is_blocked, bench_group_resolution);
criterion_main!(benches);
