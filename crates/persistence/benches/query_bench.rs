use std::hint::black_box;

use common::{Condition, Query};
use criterion::{Criterion, criterion_group, criterion_main};
use persistence::translate;

fn book_search() -> Query {
    Query::with(Condition::matches("title", "rust"))
        .and(Condition::matches("author_name", "klabnik"))
        .and(Condition::matches("description", "ownership"))
}

fn bench_translate_search(c: &mut Criterion) {
    let query = book_search();

    c.bench_function("query/translate_book_search", |b| {
        b.iter(|| translate(black_box(&query)).unwrap());
    });
}

fn bench_translate_wide(c: &mut Criterion) {
    let query = (0..50).fold(Query::new(), |q, i| {
        if i % 2 == 0 {
            q.or(Condition::equal("user_id", format!("user-{i}")))
        } else {
            q.and(Condition::not_equal("status", "CANCELLED"))
        }
    });

    c.bench_function("query/translate_50_conditions", |b| {
        b.iter(|| translate(black_box(&query)).unwrap());
    });
}

criterion_group!(benches, bench_translate_search, bench_translate_wide);
criterion_main!(benches);
