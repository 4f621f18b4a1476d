#![forbid(unsafe_code)]

use std::hint::black_box;

use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;

use merc_aterm::ATerm;
use merc_aterm::TermPool;
use merc_sabre::RewriteSpecification;
use merc_sabre::RewriteStrategy;
use merc_sabre::create_rewriter;
use merc_sabre::test_utility::create_rewrite_rule;

/// Peano arithmetic with addition and the Fibonacci function.
fn fibonacci(pool: &TermPool) -> RewriteSpecification {
    RewriteSpecification::new(vec![
        create_rewrite_rule(pool, "plus(x, 0)", "x", &["x"]).unwrap(),
        create_rewrite_rule(pool, "plus(x, s(y))", "s(plus(x, y))", &["x", "y"]).unwrap(),
        create_rewrite_rule(pool, "fib(0)", "0", &[]).unwrap(),
        create_rewrite_rule(pool, "fib(s(0))", "s(0)", &[]).unwrap(),
        create_rewrite_rule(pool, "fib(s(s(x)))", "plus(fib(x), fib(s(x)))", &["x"]).unwrap(),
    ])
    .unwrap()
}

/// Returns the term s^n(0) wrapped in the given unary function.
fn successor(pool: &TermPool, function: &str, n: usize) -> ATerm {
    let mut text = "0".to_string();
    for _ in 0..n {
        text = format!("s({text})");
    }

    pool.from_string(&format!("{function}({text})")).unwrap()
}

pub fn criterion_benchmark_rewriting(c: &mut Criterion) {
    let pool = TermPool::new();
    let spec = fibonacci(&pool);

    for strategy in [RewriteStrategy::Innermost, RewriteStrategy::Compiling] {
        let mut rewriter = create_rewriter(&pool, &spec, strategy).unwrap();

        for n in [10, 15] {
            let term = successor(&pool, "fib", n);

            c.bench_function(&format!("{strategy} fib {n}"), |bencher| {
                bencher.iter(|| {
                    let _ = black_box(rewriter.rewrite(&term));
                });
            });
        }
    }
}

pub fn criterion_benchmark_compilation(c: &mut Criterion) {
    let pool = TermPool::new();
    let spec = fibonacci(&pool);
    let term = successor(&pool, "fib", 2);

    c.bench_function("compile fib", |bencher| {
        bencher.iter(|| {
            // Every rewriter compiles the programs on first use.
            let mut rewriter = create_rewriter(&pool, &spec, RewriteStrategy::Compiling).unwrap();
            let _ = black_box(rewriter.rewrite(&term));
        });
    });
}

criterion_group!(benches, criterion_benchmark_rewriting, criterion_benchmark_compilation);
criterion_main!(benches);
