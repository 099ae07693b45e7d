// Exact t-SNE projection with a deterministic seed.
// O(n^2) per iteration, which is adequate at knowledge-base scale.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const EARLY_EXAGGERATION: f64 = 12.0;
const EXAGGERATION_ITERS: usize = 100;
const LEARNING_RATE: f64 = 200.0;
const ITERATIONS: usize = 500;
const MIN_PROBABILITY: f64 = 1e-12;

/// Project `vectors` into `dims` dimensions. Deterministic for a given seed.
pub(crate) fn run(vectors: &[Vec<f32>], dims: usize, perplexity: f64, seed: u64) -> Vec<Vec<f32>> {
    let n = vectors.len();
    let p = joint_probabilities(vectors, perplexity);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut y = vec![vec![0.0f64; dims]; n];
    for point in &mut y {
        for value in point.iter_mut() {
            *value = 1e-4 * gaussian(&mut rng);
        }
    }

    let mut velocity = vec![vec![0.0f64; dims]; n];
    let mut gains = vec![vec![1.0f64; dims]; n];
    let mut gradient = vec![0.0f64; dims];
    let mut numerators = vec![0.0f64; n * n];

    for iteration in 0..ITERATIONS {
        let exaggeration = if iteration < EXAGGERATION_ITERS {
            EARLY_EXAGGERATION
        } else {
            1.0
        };
        let momentum = if iteration < 250 { 0.5 } else { 0.8 };

        // Student-t kernel numerators and their sum
        let mut q_sum = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let value = 1.0 / (1.0 + squared_distance(&y[i], &y[j]));
                numerators[i * n + j] = value;
                numerators[j * n + i] = value;
                q_sum += 2.0 * value;
            }
        }
        let q_sum = q_sum.max(f64::MIN_POSITIVE);

        for i in 0..n {
            gradient.fill(0.0);
            for j in 0..n {
                if i == j {
                    continue;
                }
                let numerator = numerators[i * n + j];
                let q = (numerator / q_sum).max(MIN_PROBABILITY);
                let weight = 4.0 * (exaggeration * p[i * n + j] - q) * numerator;
                for d in 0..dims {
                    gradient[d] += weight * (y[i][d] - y[j][d]);
                }
            }

            for d in 0..dims {
                let same_direction = gradient[d].signum() == velocity[i][d].signum();
                gains[i][d] = if same_direction {
                    (gains[i][d] * 0.8).max(0.01)
                } else {
                    gains[i][d] + 0.2
                };
                velocity[i][d] =
                    momentum * velocity[i][d] - LEARNING_RATE * gains[i][d] * gradient[d];
            }
        }

        for (point, point_velocity) in y.iter_mut().zip(&velocity) {
            for (value, delta) in point.iter_mut().zip(point_velocity) {
                *value += delta;
            }
        }

        // Keep the embedding centered
        for d in 0..dims {
            let mean = y.iter().map(|point| point[d]).sum::<f64>() / n as f64;
            for point in &mut y {
                point[d] -= mean;
            }
        }
    }

    y.into_iter()
        .map(|point| point.into_iter().map(|value| value as f32).collect())
        .collect()
}

/// Symmetrized joint probabilities from a per-point binary search for the
/// bandwidth matching the target perplexity
fn joint_probabilities(vectors: &[Vec<f32>], perplexity: f64) -> Vec<f64> {
    let n = vectors.len();
    let target_entropy = perplexity.ln();

    let mut distances = vec![0.0f64; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = vectors[i]
                .iter()
                .zip(&vectors[j])
                .map(|(a, b)| {
                    let diff = f64::from(a - b);
                    diff * diff
                })
                .sum();
            distances[i * n + j] = d;
            distances[j * n + i] = d;
        }
    }

    let mut conditional = vec![0.0f64; n * n];
    let mut row = vec![0.0f64; n];
    for i in 0..n {
        let mut beta = 1.0f64;
        let mut beta_min = f64::NEG_INFINITY;
        let mut beta_max = f64::INFINITY;

        for _ in 0..50 {
            let mut sum = 0.0;
            for j in 0..n {
                row[j] = if i == j {
                    0.0
                } else {
                    (-beta * distances[i * n + j]).exp()
                };
                sum += row[j];
            }
            let sum = sum.max(f64::MIN_POSITIVE);

            let weighted: f64 = (0..n).map(|j| distances[i * n + j] * row[j]).sum();
            let entropy = sum.ln() + beta * weighted / sum;

            if (entropy - target_entropy).abs() < 1e-5 {
                break;
            }

            if entropy > target_entropy {
                beta_min = beta;
                beta = if beta_max.is_infinite() {
                    beta * 2.0
                } else {
                    (beta + beta_max) / 2.0
                };
            } else {
                beta_max = beta;
                beta = if beta_min.is_infinite() {
                    beta / 2.0
                } else {
                    (beta + beta_min) / 2.0
                };
            }
        }

        let sum: f64 = row.iter().sum::<f64>().max(f64::MIN_POSITIVE);
        for j in 0..n {
            conditional[i * n + j] = row[j] / sum;
        }
    }

    let mut joint = vec![0.0f64; n * n];
    for i in 0..n {
        for j in 0..n {
            if i != j {
                joint[i * n + j] = ((conditional[i * n + j] + conditional[j * n + i])
                    / (2.0 * n as f64))
                    .max(MIN_PROBABILITY);
            }
        }
    }

    joint
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Standard normal sample via Box-Muller
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
