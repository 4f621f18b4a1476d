//!
//! Benchmarks for the creation, inspection and serialisation of terms in a term pool.
//!

use std::array::from_fn;
use std::collections::VecDeque;
use std::hint::black_box;

use criterion::Criterion;
use criterion::criterion_group;
use criterion::criterion_main;

use merc_aterm::ATerm;
use merc_aterm::ATermBalancedTree;
use merc_aterm::ATermRead;
use merc_aterm::ATermRef;
use merc_aterm::ATermWrite;
use merc_aterm::BinaryATermReader;
use merc_aterm::BinaryATermWriter;
use merc_aterm::Symb;
use merc_aterm::Term;
use merc_aterm::TermPool;
use merc_aterm::TermPoolConfig;

/// Creates a pool without automatic garbage collection.
fn create_pool() -> TermPool {
    TermPool::with_config(TermPoolConfig {
        automatic_gc: false,
        ..TermPoolConfig::default()
    })
}

/// Creates a nested function application where f_0 = c and f_i = f(f_{i-1}, ..., f_{i-1}).
/// The parameter `depth` sets `i` and `c` is given by `leaf_name`.
fn create_nested_function<const ARITY: usize>(
    pool: &TermPool,
    function_name: &str,
    leaf_name: &str,
    depth: usize,
) -> ATerm {
    debug_assert!(depth > 0, "Depth must be greater than 0");

    let f_symbol = pool.create_symbol(function_name, ARITY).unwrap();
    let c_symbol = pool.create_symbol(leaf_name, 0).unwrap();

    let c_term = pool.create_constant(&c_symbol);
    let mut f_term = pool.create_term(&f_symbol, &from_fn::<_, ARITY, _>(|_| c_term.copy()));

    for _ in 0..depth {
        f_term = pool.create_term(&f_symbol, &from_fn::<_, ARITY, _>(|_| f_term.copy()));
    }

    debug_assert_eq!(f_term.get_head_symbol().name().as_ref(), function_name);
    f_term
}

/// Counts the number of subterm occurrences, visiting shared subterms every time.
fn inspect<'a>(term: ATermRef<'a>, iterations: usize) -> u64 {
    let mut queue: VecDeque<ATermRef<'a>> = VecDeque::new();
    let mut count = 0;

    for _ in 0..iterations {
        queue.push_back(term);

        while let Some(current_term) = queue.pop_front() {
            for arg in current_term.arguments() {
                count += 1;
                queue.push_back(arg);
            }
        }
    }

    count
}

fn benchmark_creation(c: &mut Criterion) {
    const SIZE: usize = 400000;

    c.bench_function("creation", |b| {
        b.iter(|| {
            let pool = create_pool();
            black_box(create_nested_function::<2>(&pool, "f", "c", SIZE));
        });
    });
}

fn benchmark_inspect(c: &mut Criterion) {
    const SIZE: usize = 20;

    let pool = create_pool();
    let term = create_nested_function::<2>(&pool, "f", "c", SIZE);
    assert_eq!(inspect(term.copy(), 1), 4194302);

    c.bench_function("inspect", |b| {
        b.iter(|| black_box(inspect(term.copy(), 1)));
    });
}

fn benchmark_lookup(c: &mut Criterion) {
    const SIZE: usize = 400000;

    let pool = create_pool();
    let _term = create_nested_function::<2>(&pool, "f", "c", SIZE);

    c.bench_function("lookup", |b| {
        b.iter(|| {
            // Every term already exists, so this only performs lookups.
            black_box(create_nested_function::<2>(&pool, "f", "c", SIZE));
        });
    });
}

fn benchmark_garbage_collection(c: &mut Criterion) {
    const SIZE: usize = 100000;

    c.bench_function("garbage_collection", |b| {
        b.iter(|| {
            let pool = create_pool();
            drop(create_nested_function::<2>(&pool, "f", "c", SIZE));
            black_box(pool.collect());
        });
    });
}

fn benchmark_binary_stream(c: &mut Criterion) {
    const SIZE: usize = 10000;

    let pool = create_pool();
    let term = create_nested_function::<3>(&pool, "f", "c", SIZE);

    c.bench_function("binary_stream", |b| {
        b.iter(|| {
            let mut stream: Vec<u8> = Vec::new();
            {
                let mut writer = BinaryATermWriter::new(&pool, &mut stream).unwrap();
                writer.write_aterm(&term).unwrap();
                writer.flush().unwrap();
            }

            let mut reader = BinaryATermReader::new(&pool, &stream[..]).unwrap();
            black_box(reader.read_aterm().unwrap());
        });
    });
}

fn benchmark_balanced_tree(c: &mut Criterion) {
    const SIZE: u64 = 100000;

    let pool = create_pool();
    let elements: Vec<ATerm> = (0..SIZE).map(|i| pool.create_int(i)).collect();

    c.bench_function("balanced_tree", |b| {
        b.iter(|| {
            let tree = ATermBalancedTree::<ATerm>::new(&pool, elements.iter().cloned());
            black_box(tree.element_at(SIZE as usize / 2, SIZE as usize));
        });
    });
}

criterion_group!(
    benches,
    benchmark_creation,
    benchmark_inspect,
    benchmark_lookup,
    benchmark_garbage_collection,
    benchmark_binary_stream,
    benchmark_balanced_tree,
);
criterion_main!(benches);
