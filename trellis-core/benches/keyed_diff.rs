//! Benchmark: keyed child diff and LIS

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use trellis_core::host::MemoryHost;
use trellis_core::props;
use trellis_core::reactive::Runtime;
use trellis_core::renderer::{longest_increasing_subsequence, NodeHandle, Renderer};
use trellis_core::vnode::{h, VNodeRef};

fn keyed_list(keys: &[usize]) -> VNodeRef {
    let items = keys
        .iter()
        .map(|&k| h("li", props! { "key" => k }, k.to_string()))
        .collect::<Vec<_>>();
    h("ul", props! {}, items)
}

/// Deterministic shuffle so runs are comparable.
fn scrambled(len: usize) -> Vec<usize> {
    let mut keys: Vec<usize> = (0..len).collect();
    let mut seed = 0x2545_f491_u64;
    for i in (1..len).rev() {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        keys.swap(i, (seed % (i as u64 + 1)) as usize);
    }
    keys
}

fn mounted(keys: &[usize]) -> (Renderer<MemoryHost>, NodeHandle) {
    let rt = Runtime::new();
    let mut host = MemoryHost::new();
    let root = host.create_root("app");
    let renderer = Renderer::new(&rt, host);
    renderer.render(Some(keyed_list(keys)), root);
    (renderer, root)
}

fn benchmark_lis(c: &mut Criterion) {
    let mut group = c.benchmark_group("lis");
    for len in [100, 1_000, 10_000] {
        let positions: Vec<usize> = scrambled(len).into_iter().map(|p| p + 1).collect();
        group.bench_with_input(BenchmarkId::from_parameter(len), &positions, |b, positions| {
            b.iter(|| longest_increasing_subsequence(black_box(positions)))
        });
    }
    group.finish();
}

fn benchmark_keyed_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("keyed_diff");
    for len in [100, 1_000] {
        let sorted: Vec<usize> = (0..len).collect();
        let shuffled = scrambled(len);
        let mut swapped = sorted.clone();
        swapped.swap(1, len - 2);
        let mut appended = sorted.clone();
        appended.extend(len..len + 10);

        for (name, next) in [("shuffle", &shuffled), ("swap", &swapped), ("append", &appended)] {
            group.bench_with_input(BenchmarkId::new(name, len), next, |b, next| {
                b.iter_batched(
                    || (mounted(&sorted), keyed_list(next)),
                    |((renderer, root), tree)| renderer.render(Some(tree), root),
                    BatchSize::SmallInput,
                )
            });
        }
    }
    group.finish();
}

criterion_group!(benches, benchmark_lis, benchmark_keyed_diff);
criterion_main!(benches);
