use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tensor_factor::*;

fn term(coefficient: f64, rhs: &[&str]) -> Term {
    let rhs = rhs.iter().map(|s| s.parse().unwrap()).collect();
    Term::new("(R a b i j)".parse().unwrap(), coefficient, rhs)
}

fn ccd_doubles() -> Vec<Equation> {
    let residual = vec![
        term(1.0, &["(V a b i j)"]).with_assignment(true),
        term(0.5, &["(V a b c d)", "(t2 c d i j)"]),
        term(0.5, &["(V k l i j)", "(t2 a b k l)"]),
        term(1.0, &["(V k b c j)", "(t2 a c i k)"]),
        term(1.0, &["(f b c)", "(t2 a c i j)"]),
        term(-1.0, &["(f k j)", "(t2 a b i k)"]),
        term(0.25, &["(V k l c d)", "(t2 c d i j)", "(t2 a b k l)"]),
        term(1.0, &["(V k l c d)", "(t2 a c i k)", "(t2 d b l j)"]),
        term(-0.5, &["(V k l c d)", "(t2 c a k l)", "(t2 d b i j)"]),
        term(-0.5, &["(V k l c d)", "(t2 d c i k)", "(t2 a b l j)"]),
        term(0.5, &["(V k l c d)", "(t2 a c i k)", "(t2 b d j l)"]),
        term(-0.5, &["(V k l c d)", "(t2 c d i l)", "(t2 a b k j)"]),
    ];
    vec![Equation::new("rt2", residual).unwrap()]
}

fn factorize(threads: usize) -> Factorizer {
    let config = Config::default().with_threads(threads);
    let mut f = Factorizer::new(config)
        .unwrap()
        .with_equations(ccd_doubles())
        .unwrap();
    f.substitute();
    f
}

fn threads(c: &mut Criterion) {
    let mut group = c.benchmark_group("ccd doubles");
    group.sample_size(10);
    for n in [1, 2, 4] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter(|| factorize(n))
        });
    }
    group.finish();
}

fn best_permutation(c: &mut Criterion) {
    let product: Vertex = "(* (V k l c d) (t2 c d i j) (t2 a b k l) (t1 e m))"
        .parse()
        .unwrap();
    c.bench_function("best permutation", |b| {
        b.iter(|| {
            product.as_link().map(|link| {
                link.forget();
                link.best_permutation()
            })
        })
    });
}

criterion_group!(benches, threads, best_permutation);
criterion_main!(benches);
