use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use field_handles::{Counted, OwningIndexedList, OwningKeyedTable, RefOrPointer, TempHandle};
use std::time::Duration;

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn key(n: u64) -> String {
    format!("k{:016x}", n)
}

fn bench_temp_clone_drop(c: &mut Criterion) {
    c.bench_function("temp_handle_clone_drop", |b| {
        let h = TempHandle::from_value(Counted::new(vec![0.0f64; 64]));
        b.iter(|| {
            let x = h.clone();
            black_box(&x);
            drop(x);
        })
    });
}

fn bench_ptr_steal_vs_clone(c: &mut Criterion) {
    c.bench_function("ref_or_ptr_steal_1k", |b| {
        b.iter_batched(
            || RefOrPointer::from_value(vec![0.0f64; 1024]),
            |mut h| black_box(h.ptr()),
            BatchSize::SmallInput,
        )
    });
    c.bench_function("ref_or_ptr_clone_1k", |b| {
        let field = vec![0.0f64; 1024];
        b.iter(|| {
            let mut h = RefOrPointer::borrowed(&field);
            black_box(h.ptr())
        })
    });
}

fn bench_list_push_set(c: &mut Criterion) {
    c.bench_function("owning_list_push_10k", |b| {
        b.iter_batched(
            OwningIndexedList::<u64>::new,
            |mut l| {
                for x in lcg(1).take(10_000) {
                    l.push_back(Box::new(x));
                }
                black_box(l)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("owning_list_set", |b| {
        let mut l = OwningIndexedList::<u64>::with_len(4096);
        let mut it = lcg(3).map(|x| (x as usize) & 4095);
        b.iter(|| {
            let i = it.next().unwrap();
            black_box(l.set(i, Box::new(i as u64)));
        })
    });
}

fn bench_table_set_find(c: &mut Criterion) {
    c.bench_function("owning_table_set_10k", |b| {
        b.iter_batched(
            OwningKeyedTable::<String, u64>::new,
            |mut t| {
                for (i, x) in lcg(1).take(10_000).enumerate() {
                    t.set(key(x), Box::new(i as u64));
                }
                black_box(t)
            },
            BatchSize::SmallInput,
        )
    });
    c.bench_function("owning_table_get_hit", |b| {
        let mut t = OwningKeyedTable::<String, u64>::new();
        let keys: Vec<_> = lcg(7).take(20_000).map(key).collect();
        for (i, k) in keys.iter().enumerate() {
            t.set(k.clone(), Box::new(i as u64));
        }
        let mut it = keys.iter().cycle();
        b.iter(|| {
            let k = it.next().unwrap();
            black_box(t.get(k.as_str()));
        })
    });
    c.bench_function("owning_table_get_miss", |b| {
        let mut t = OwningKeyedTable::<String, u64>::new();
        for (i, x) in lcg(11).take(10_000).enumerate() {
            t.set(key(x), Box::new(i as u64));
        }
        let mut miss = lcg(0xdead_beef);
        b.iter(|| {
            let k = key(miss.next().unwrap());
            black_box(t.get(k.as_str()));
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(50)
        .measurement_time(Duration::from_secs(8))
        .warm_up_time(Duration::from_secs(2))
}

criterion_group! {
    name = benches;
    config = bench_config();
    targets = bench_temp_clone_drop, bench_ptr_steal_vs_clone, bench_list_push_set, bench_table_set_find
}
criterion_main!(benches);
