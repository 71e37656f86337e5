use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sqlmapper::{Row, StatementBuilder, TableSchema, Value, escape};
use std::sync::Arc;

fn schema(n: usize) -> Arc<TableSchema> {
    let names: Vec<String> = (0..n).map(|i| format!("col{i}")).collect();
    let columns: Vec<&str> = names.iter().map(String::as_str).collect();
    Arc::new(TableSchema::new("t", "col0", &columns))
}

/// `{ "col0" => 0, "col1" => 1, ... }`
fn predicate(n: usize) -> Row {
    (0..n)
        .map(|i| (format!("col{i}"), Value::from(i as i64)))
        .collect()
}

fn bench_filter_and_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/filter_and_render");

    for n in [1, 5, 10, 50] {
        let schema = schema(n);
        let row = predicate(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &row, |b, row| {
            let mut qb = StatementBuilder::new(Arc::clone(&schema), false);
            b.iter(|| {
                qb.filter(row.clone()).order(["-col0"]).limit(10);
                black_box(qb.to_sql())
            });
        });
    }

    group.finish();
}

fn bench_insert_rows(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/insert_rows");

    for n in [1, 10, 100, 500] {
        let schema = schema(8);
        let rows: Vec<Row> = (0..n).map(|_| predicate(8)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &rows, |b, rows| {
            let mut qb = StatementBuilder::new(Arc::clone(&schema), false);
            b.iter(|| {
                qb.insert(rows.clone());
                black_box(qb.to_sql())
            });
        });
    }

    group.finish();
}

fn bench_escape_text(c: &mut Criterion) {
    let mut group = c.benchmark_group("statement_builder/escape_text");

    for len in [16, 256, 4096] {
        let value = Value::from("it's a \"quoted\"\n\\line ".repeat(len / 16));
        group.bench_with_input(BenchmarkId::from_parameter(len), &value, |b, value| {
            b.iter(|| black_box(escape(value)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_filter_and_render,
    bench_insert_rows,
    bench_escape_text
);
criterion_main!(benches);
