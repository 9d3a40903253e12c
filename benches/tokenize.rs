use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use maker_req::{limits::ParseLimits, Jar, Join, Pool, Query};

fn query_string(params: usize) -> Vec<u8> {
    (0..params)
        .map(|i| format!("key{i}=value+number+{i}%21"))
        .collect::<Vec<_>>()
        .join("&")
        .into_bytes()
}

fn cookie_header(cookies: usize) -> Vec<u8> {
    (0..cookies)
        .map(|i| format!("c{i}=\"v{i}\"; $Path=/p{i}"))
        .collect::<Vec<_>>()
        .join("; ")
        .into_bytes()
}

fn query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");
    let limits = ParseLimits::default();

    for params in [1, 10, 50] {
        let input = query_string(params);
        let mut pool = Pool::with_capacity(16 * 1024);

        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(params), &input, |b, input| {
            b.iter(|| {
                pool.reset();
                let mut table = maker_req::Table::new(&pool);
                Query::parse_into(&pool, &mut table, black_box(input), &limits).unwrap();
                black_box(table.len());
            })
        });
    }

    group.finish();
}

fn jar(c: &mut Criterion) {
    let mut group = c.benchmark_group("jar");

    for cookies in [1, 10, 40] {
        let input = cookie_header(cookies);
        let mut pool = Pool::with_capacity(16 * 1024);

        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(cookies), &input, |b, input| {
            b.iter(|| {
                pool.reset();
                black_box(Jar::parse(&pool, black_box(input)).unwrap().len());
            })
        });
    }

    group.finish();
}

fn join(c: &mut Criterion) {
    let input = b"tag=a&tag=b%20c&tag=%22d%22&other=1&tag=e&".repeat(10);
    let pool = Pool::new();
    let limits = ParseLimits::unlimited();
    let mut table = maker_req::Table::new(&pool);
    Query::parse_into(&pool, &mut table, &input, &limits).unwrap();

    c.bench_function("join_quote", |b| {
        b.iter(|| black_box(table.join(Some(b"tag"), Join::Quote)))
    });
}

criterion_group!(benches, query, jar, join);
criterion_main!(benches);
