
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mopso::{Bounds, Evaluator, Swarm};

fn unit_box(dims: usize) -> Bounds {
    Bounds::new(vec![0.0; dims], vec![1.0; dims]).unwrap()
}

fn bench_zdt1(c: &mut Criterion) {
    let mut group = c.benchmark_group("zdt1");
    group.sample_size(10);

    for dims in [2, 10, 30] {
        group.bench_with_input(BenchmarkId::new("dims", dims), &dims, |b, &dims| {
            b.iter(|| {
                let mut swarm = Swarm::builder(unit_box(dims))
                    .num_objectives(2)
                    .num_particles(50)
                    .seed(42)
                    .build(Evaluator::individual(test_functions::zdt1))
                    .unwrap();
                swarm.optimize(100).unwrap().len()
            });
        });
    }
    group.finish();
}

fn bench_swarm_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("swarm_size");
    group.sample_size(10);

    for particles in [10, 50, 200] {
        group.bench_with_input(
            BenchmarkId::new("particles", particles),
            &particles,
            |b, &particles| {
                b.iter(|| {
                    let mut swarm = Swarm::builder(Bounds::new(vec![-5.0], vec![5.0]).unwrap())
                        .num_objectives(2)
                        .num_particles(particles)
                        .seed(42)
                        .build(Evaluator::individual(test_functions::schaffer_n1))
                        .unwrap();
                    swarm.optimize(50).unwrap().len()
                });
            },
        );
    }
    group.finish();
}

fn bench_individual_vs_batched(c: &mut Criterion) {
    let mut group = c.benchmark_group("individual_vs_batched");
    group.sample_size(10);

    group.bench_function("individual", |b| {
        b.iter(|| {
            let mut swarm = Swarm::builder(unit_box(10))
                .num_objectives(2)
                .num_particles(50)
                .seed(7)
                .build(Evaluator::individual(test_functions::zdt1))
                .unwrap();
            swarm.optimize(50).unwrap().len()
        });
    });

    group.bench_function("batched", |b| {
        b.iter(|| {
            let evaluator = Evaluator::batched(|xs: &[Vec<f64>], _: u64| {
                xs.iter().map(|x| test_functions::zdt1(x)).collect::<Vec<_>>()
            });
            let mut swarm = Swarm::builder(unit_box(10))
                .num_objectives(2)
                .num_particles(50)
                .seed(7)
                .build(evaluator)
                .unwrap();
            swarm.optimize(50).unwrap().len()
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_zdt1,
    bench_swarm_size,
    bench_individual_vs_batched
);
criterion_main!(benches);
