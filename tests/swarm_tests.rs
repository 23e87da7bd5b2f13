//! Integration tests for the swarm optimization loop.

use core::cell::RefCell;
use std::rc::Rc;

use mopso::pareto::dominates;
use mopso::{Bounds, Error, Evaluator, FitnessSentinel, OptimizationMode, RandomSource, Swarm};

/// Replays a fixed sequence of draws.
struct Script {
    values: Vec<f64>,
    next: usize,
}

impl Script {
    fn new(values: Vec<f64>) -> Self {
        Self { values, next: 0 }
    }
}

impl RandomSource for Script {
    fn next_f64(&mut self) -> f64 {
        let v = self.values[self.next % self.values.len()];
        self.next += 1;
        v
    }
}

fn unit_box(dims: usize) -> Bounds {
    Bounds::new(vec![0.0; dims], vec![1.0; dims]).unwrap()
}

fn zdt1(x: &[f64]) -> Vec<f64> {
    let g = 1.0 + 9.0 * x[1..].iter().sum::<f64>() / (x.len() - 1) as f64;
    vec![x[0], g * (1.0 - (x[0] / g).sqrt())]
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-12, "{actual:?} != {expected:?}");
    }
}

// ---------------------------------------------------------------------------
// One iteration by hand
// ---------------------------------------------------------------------------

#[test]
fn test_first_iteration_matches_closed_form() {
    // Initial positions (0.2, 0.4), (0.6, 0.8), (0.9, 0.1); then for each
    // particle: leader draw 0.0 (first front member), r1 = r2 = 0.5.
    let script = Script::new(vec![
        0.2, 0.4, 0.6, 0.8, 0.9, 0.1, //
        0.0, 0.5, 0.5, //
        0.0, 0.5, 0.5, //
        0.0, 0.5, 0.5,
    ]);
    let mut swarm = Swarm::builder(unit_box(2))
        .num_objectives(2)
        .num_particles(3)
        .rng(script)
        .build(Evaluator::individual(|x: &[f64]| x.to_vec()))
        .unwrap();

    swarm.step().unwrap();

    let front: Vec<&[f64]> = swarm.pareto_front().iter().map(|m| m.fitness()).collect();
    assert_eq!(front, vec![&[0.2, 0.4][..], &[0.9, 0.1][..]]);

    let particles = swarm.particles();
    // Already on its own best and on the leader: does not move.
    assert_close(particles[0].velocity(), &[0.0, 0.0]);
    assert_close(particles[0].position(), &[0.2, 0.4]);
    // Pulled halfway to the leader.
    assert_close(particles[1].velocity(), &[-0.2, -0.2]);
    assert_close(particles[1].position(), &[0.4, 0.6]);
    assert_close(particles[2].velocity(), &[-0.35, 0.15]);
    assert_close(particles[2].position(), &[0.55, 0.25]);

    assert_eq!(swarm.iteration(), 1);
    assert_eq!(swarm.history(), &[vec![0.2, 0.4]]);
    assert_eq!(swarm.global_best_position(), &[0.2, 0.4]);
}

#[test]
fn test_overshoot_lands_on_the_wall() {
    // Particles at (0.1, 0.1) and (0.9, 0.9) are both on the front. The
    // first draws the second as its leader and a large social pull throws
    // it far past the upper bound.
    let mut swarm = Swarm::builder(unit_box(2))
        .num_objectives(2)
        .num_particles(2)
        .social_coefficient(50.0)
        .rng(Script::new(vec![
            0.1, 0.1, 0.9, 0.9, //
            0.9, 0.99, 0.99, //
            0.9, 0.99, 0.99,
        ]))
        .build(Evaluator::individual(|x: &[f64]| vec![x[0], 1.0 - x[0]]))
        .unwrap();

    swarm.step().unwrap();
    let particles = swarm.particles();
    assert_eq!(particles[0].position(), &[1.0, 1.0]);
    assert!(particles[0].velocity().iter().all(|&v| v > 1.0));
    // Its own leader: no pull at all.
    assert_eq!(particles[1].position(), &[0.9, 0.9]);
}

// ---------------------------------------------------------------------------
// Invariants over longer runs
// ---------------------------------------------------------------------------

#[test]
fn test_positions_stay_in_bounds() {
    let bounds = Bounds::new(vec![0.0; 10], vec![1.0; 10]).unwrap();
    let mut swarm = Swarm::builder(bounds.clone())
        .num_objectives(2)
        .num_particles(40)
        .inertia_weight(1.2)
        .cognitive_coefficient(2.0)
        .social_coefficient(2.0)
        .seed(3)
        .build(Evaluator::individual(zdt1))
        .unwrap();

    for _ in 0..60 {
        swarm.step().unwrap();
        for p in swarm.particles() {
            assert!(bounds.contains(p.position()), "{:?} escaped", p.position());
        }
    }
}

#[test]
fn test_front_is_mutually_non_dominated() {
    let mut swarm = Swarm::builder(unit_box(5))
        .num_objectives(2)
        .num_particles(30)
        .seed(11)
        .build(Evaluator::individual(zdt1))
        .unwrap();
    let front = swarm.optimize(40).unwrap().to_vec();
    assert!(!front.is_empty());

    for a in &front {
        for b in &front {
            assert!(
                !dominates(a.fitness(), b.fitness()),
                "front member {:?} dominates {:?}",
                a.fitness(),
                b.fitness()
            );
        }
    }
}

#[test]
fn test_no_evaluated_particle_dominates_the_front() {
    let mut swarm = Swarm::builder(unit_box(3))
        .num_objectives(2)
        .num_particles(20)
        .seed(5)
        .build(Evaluator::individual(zdt1))
        .unwrap();
    swarm.optimize(25).unwrap();

    for p in swarm.particles() {
        for m in swarm.pareto_front() {
            assert!(!dominates(p.fitness(), m.fitness()));
        }
    }
}

#[test]
fn test_history_is_monotone_and_one_row_per_iteration() {
    let mut swarm = Swarm::builder(unit_box(4))
        .num_objectives(2)
        .num_particles(15)
        .seed(9)
        .build(Evaluator::individual(zdt1))
        .unwrap();
    swarm.optimize(20).unwrap();

    assert_eq!(swarm.history().len(), 20);
    for pair in swarm.history().windows(2) {
        assert!(
            pair[1].iter().zip(&pair[0]).all(|(now, before)| now <= before),
            "global best got worse: {:?} -> {:?}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn test_same_seed_same_run() {
    let run = || {
        let mut swarm = Swarm::builder(unit_box(3))
            .num_objectives(2)
            .num_particles(12)
            .seed(2024)
            .build(Evaluator::individual(zdt1))
            .unwrap();
        swarm.optimize(15).unwrap();
        swarm.checkpoint()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_schaffer_front_reaches_pareto_set() {
    let mut swarm = Swarm::builder(Bounds::new(vec![-10.0], vec![10.0]).unwrap())
        .num_objectives(2)
        .num_particles(30)
        .seed(1)
        .build(Evaluator::individual(|x: &[f64]| {
            vec![x[0] * x[0] / 100.0, (x[0] - 2.0).powi(2) / 144.0]
        }))
        .unwrap();
    let front = swarm.optimize(50).unwrap();
    assert!(
        front
            .iter()
            .any(|m| (0.0..=2.0).contains(&m.position()[0]))
    );
}

// ---------------------------------------------------------------------------
// Evaluation modes and errors
// ---------------------------------------------------------------------------

#[test]
fn test_batched_mode_calls_once_per_iteration() {
    let iterations = Rc::new(RefCell::new(Vec::new()));
    let seen = Rc::clone(&iterations);
    let evaluator = Evaluator::batched(move |xs: &[Vec<f64>], iteration: u64| {
        seen.borrow_mut().push((iteration, xs.len()));
        xs.iter().map(|x| vec![x[0], 1.0 - x[0]]).collect::<Vec<_>>()
    });
    let mut swarm = Swarm::builder(unit_box(2))
        .num_objectives(2)
        .num_particles(8)
        .seed(4)
        .build(evaluator)
        .unwrap();
    assert_eq!(swarm.config().optimization_mode, OptimizationMode::Global);

    swarm.optimize(4).unwrap();
    assert_eq!(
        *iterations.borrow(),
        vec![(0, 8), (1, 8), (2, 8), (3, 8)]
    );
}

#[test]
fn test_several_objective_functions_concatenate() {
    let evaluator = Evaluator::from_individual(vec![
        Box::new(|x: &[f64]| vec![0.25 + 0.5 * x[0]]),
        Box::new(|x: &[f64]| vec![0.75 - 0.5 * x[0]]),
    ]);
    let mut swarm = Swarm::builder(unit_box(1))
        .num_particles(6)
        .seed(8)
        .build(evaluator)
        .unwrap();
    assert_eq!(swarm.config().num_objectives, 2);
    swarm.optimize(3).unwrap();
    for m in swarm.pareto_front() {
        assert!((m.fitness()[0] + m.fitness()[1] - 1.0).abs() < 1e-12);
    }
}

#[test]
fn test_wrong_batch_size_is_fatal_and_commits_nothing() {
    let evaluator = Evaluator::batched(|xs: &[Vec<f64>], _: u64| {
        xs.iter().skip(1).map(|x| vec![x[0], x[1]]).collect::<Vec<_>>()
    });
    let mut swarm = Swarm::builder(unit_box(2))
        .num_objectives(2)
        .num_particles(5)
        .seed(1)
        .build(evaluator)
        .unwrap();
    let before = swarm.checkpoint();

    let err = swarm.optimize(3).unwrap_err();
    assert!(matches!(
        err,
        Error::BatchSizeMismatch {
            expected: 5,
            got: 4
        }
    ));
    assert_eq!(swarm.checkpoint(), before);
}

#[test]
fn test_wrong_arity_is_fatal() {
    let mut swarm = Swarm::builder(unit_box(2))
        .num_objectives(3)
        .num_particles(4)
        .seed(1)
        .build(Evaluator::individual(|x: &[f64]| x.to_vec()))
        .unwrap();
    assert!(matches!(
        swarm.step(),
        Err(Error::ObjectiveDimensionMismatch {
            expected: 3,
            got: 2
        })
    ));
    assert_eq!(swarm.iteration(), 0);
}

#[test]
fn test_failed_evaluations_return_worst_and_never_lead() {
    // Every evaluation "fails" for x[0] > 0.5.
    let mut swarm = Swarm::builder(unit_box(2))
        .num_objectives(2)
        .num_particles(20)
        .seed(6)
        .build(Evaluator::individual(|x: &[f64]| {
            if x[0] > 0.5 {
                vec![1.0, 1.0]
            } else {
                vec![0.1 + x[0], 0.6 - x[0]]
            }
        }))
        .unwrap();
    swarm.optimize(10).unwrap();
    assert!(
        swarm
            .pareto_front()
            .iter()
            .all(|m| m.fitness() != [1.0, 1.0])
    );
}

#[test]
fn test_custom_sentinel() {
    let sentinel = FitnessSentinel {
        worst: 100.0,
        singular: -1.0,
    };
    let swarm = Swarm::builder(unit_box(2))
        .num_objectives(2)
        .num_particles(3)
        .seed(1)
        .build(Evaluator::individual(|x: &[f64]| x.to_vec()).sentinel(sentinel))
        .unwrap();
    for p in swarm.particles() {
        assert_eq!(p.best_fitness(), &[100.0, 100.0]);
        assert_eq!(p.fitness(), &[100.0, 100.0]);
    }
}

// ---------------------------------------------------------------------------
// Early stop and the current front
// ---------------------------------------------------------------------------

#[test]
fn test_stops_after_iterations_without_improvement() {
    // Frozen particles with a constant objective: only the first
    // iteration adds to the front.
    let mut swarm = Swarm::builder(unit_box(2))
        .num_objectives(2)
        .num_particles(5)
        .inertia_weight(0.0)
        .cognitive_coefficient(0.0)
        .social_coefficient(0.0)
        .max_iterations_without_improvement(3)
        .seed(2)
        .build(Evaluator::individual(|_: &[f64]| vec![0.5, 0.5]))
        .unwrap();

    let front_len = swarm.optimize(100).unwrap().len();
    assert_eq!(front_len, 5);
    assert_eq!(swarm.iteration(), 4);
    assert_eq!(swarm.stalled_iterations(), 3);
}

#[test]
fn test_without_limit_runs_every_iteration() {
    let mut swarm = Swarm::builder(unit_box(2))
        .num_objectives(2)
        .num_particles(5)
        .inertia_weight(0.0)
        .cognitive_coefficient(0.0)
        .social_coefficient(0.0)
        .seed(2)
        .build(Evaluator::individual(|_: &[f64]| vec![0.5, 0.5]))
        .unwrap();
    swarm.optimize(12).unwrap();
    assert_eq!(swarm.iteration(), 12);
}

#[test]
fn test_current_front_is_live_and_crowding_sorted() {
    let mut swarm = Swarm::builder(unit_box(2))
        .num_objectives(2)
        .num_particles(25)
        .seed(13)
        .build(Evaluator::individual(zdt1))
        .unwrap();
    swarm.optimize(10).unwrap();

    let current = swarm.current_front();
    assert!(!current.is_empty());
    for m in &current {
        assert!(
            swarm
                .particles()
                .iter()
                .any(|p| p.position() == m.position() && p.fitness() == m.fitness())
        );
    }
    // The most isolated member sits at an extreme of some objective.
    let first = current[0].fitness();
    let at_extreme = (0..2).any(|k| {
        let values = current.iter().map(|m| m.fitness()[k]);
        let lo = values.clone().fold(f64::INFINITY, f64::min);
        let hi = values.fold(f64::NEG_INFINITY, f64::max);
        first[k] == lo || first[k] == hi
    });
    assert!(at_extreme, "{first:?} is not a boundary member");
}
