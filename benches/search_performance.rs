use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tabscan::ingest::{ColumnSet, IngestionResult, LineTable};
use tabscan::parser::{ColumnParser, TextEncoding};
use tabscan::search::{search_chunked, SearchQuery, SearchRequest, SearchSession};
use tabscan::workflow::WorkflowReport;
use tokio::runtime::Runtime;

const HEADER: &[u8] = b"id;customer;city;status;amount;note";

fn create_table(rows: usize, pattern_frequency: usize) -> LineTable {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let cities = ["Oslo", "Bergen", "Trondheim", "Stavanger", "Tromso"];
    let statuses = ["open", "paid", "overdue", "cancelled"];

    let lines = (0..rows).map(|i| {
        let note = if i % pattern_frequency == 0 {
            "\"escalated; needle\"".to_string()
        } else {
            format!("ref-{:08x}", rng.gen::<u32>())
        };
        format!(
            "{};customer_{};{};{};{}.{:02};{}",
            i,
            rng.gen_range(0..50_000),
            cities[rng.gen_range(0..cities.len())],
            statuses[i % statuses.len()],
            rng.gen_range(1..10_000),
            rng.gen_range(0..100),
            note
        )
        .into_bytes()
    });

    LineTable::from_lines(lines.collect::<Vec<_>>())
}

fn result_for(table: LineTable) -> IngestionResult {
    IngestionResult {
        path: "bench.csv".into(),
        delimiter: b';',
        encoding: TextEncoding::Utf8,
        columns: ColumnSet::from_header(HEADER, b';', TextEncoding::Utf8),
        lines: Arc::new(table),
        content_hash: "BENCH".to_string(),
        report: WorkflowReport::default(),
    }
}

fn bench_chunk_counts(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("search_chunks");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(5));

    let table = Arc::new(create_table(500_000, 100));
    let request = Arc::new(SearchRequest::new("needle", 0..6, 6, b';'));

    for chunks in [1, 2, 4, 8, 16] {
        group.bench_with_input(BenchmarkId::new("all_columns", chunks), &chunks, |b, &chunks| {
            b.iter(|| {
                let rows = rt.block_on(search_chunked(
                    Arc::clone(&table),
                    Arc::clone(&request),
                    chunks,
                ));
                let _ = black_box(rows);
            });
        });
    }

    group.finish();
}

fn bench_search_modes(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("search_modes");
    group.sample_size(10);

    let sizes = [10_000, 100_000, 1_000_000];

    for &rows in &sizes {
        let table = Arc::new(create_table(rows, 100));

        // Frequent raw hit, rejected by the column check
        let scoped = Arc::new(SearchRequest::new("paid", [0, 5], 6, b';').with_search_columns(vec![5]));
        group.bench_with_input(BenchmarkId::new("selected_columns", rows), &scoped, |b, req| {
            b.iter(|| {
                let rows = rt.block_on(search_chunked(Arc::clone(&table), Arc::clone(req), 4));
                let _ = black_box(rows);
            });
        });

        // Term that never occurs: fast reject only
        let missing = Arc::new(SearchRequest::new("not-present", [0], 6, b';'));
        group.bench_with_input(BenchmarkId::new("no_match", rows), &missing, |b, req| {
            b.iter(|| {
                let rows = rt.block_on(search_chunked(Arc::clone(&table), Arc::clone(req), 4));
                let _ = black_box(rows);
            });
        });
    }

    group.finish();
}

fn bench_session_paging(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("session_paging");
    group.sample_size(20);

    let mut result = result_for(create_table(200_000, 10));
    result.columns.set_order_by(Some(2)).unwrap();

    group.bench_function("sorted_rescan", |b| {
        b.iter(|| {
            let mut session = SearchSession::new();
            let page = rt.block_on(session.query(&result, &SearchQuery::new("needle")));
            let _ = black_box(page);
        });
    });

    group.bench_function("cached_random_page", |b| {
        let mut session = SearchSession::new();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        rt.block_on(session.query(&result, &SearchQuery::new("needle")))
            .unwrap();
        b.iter(|| {
            let query = SearchQuery::new("needle").page(rng.gen_range(1..400));
            let page = rt.block_on(session.query(&result, &query));
            let _ = black_box(page);
        });
    });

    group.finish();
}

fn bench_column_parser(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_parser");
    let parser = ColumnParser::new(b';');
    let plain = b"123;customer_77;Oslo;paid;1200.50;ref-0000beef".as_slice();
    let quoted = b"123;\"customer; 77\";Oslo;\"paid\";1200.50;\"escalated; needle\"".as_slice();

    group.bench_function("plain_line", |b| b.iter(|| black_box(parser.parse(black_box(plain), 6))));
    group.bench_function("quoted_line", |b| {
        b.iter(|| black_box(parser.parse(black_box(quoted), 6)))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_chunk_counts,
    bench_search_modes,
    bench_session_paging,
    bench_column_parser
);
criterion_main!(benches);
