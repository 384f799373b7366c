use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use rust_fcnet::{Activation, Matrix, NetworkBuilder, Optimizer, Regularization, Schedule};

const CLASSES: usize = 3;
const DIM: usize = 2;
const PER_CLASS: usize = 100;
const BATCH: usize = 16;
const EPOCHS: usize = 30;

fn sample_blobs<R: Rng>(rng: &mut R) -> Vec<(Vec<f64>, usize)> {
    let centers = [[0.0, 2.0], [-2.0, -1.0], [2.0, -1.0]];
    let noise = Normal::new(0.0, 0.6).expect("valid std");

    let mut points = Vec::with_capacity(CLASSES * PER_CLASS);
    for (class, center) in centers.iter().enumerate() {
        for _ in 0..PER_CLASS {
            let x: Vec<f64> = center.iter().map(|c| c + noise.sample(rng)).collect();
            points.push((x, class));
        }
    }
    points
}

fn to_batch(points: &[(Vec<f64>, usize)]) -> rust_fcnet::Result<(Matrix, Matrix)> {
    let columns: Vec<Vec<f64>> = points.iter().map(|(x, _)| x.clone()).collect();
    let labels: Vec<usize> = points.iter().map(|(_, y)| *y).collect();
    Ok((
        Matrix::from_columns(&columns)?,
        Matrix::one_hot(&labels, CLASSES)?,
    ))
}

fn main() -> rust_fcnet::Result<()> {
    let mut rng = StdRng::seed_from_u64(0);
    let mut train = sample_blobs(&mut rng);
    let test = sample_blobs(&mut rng);

    let mut net = NetworkBuilder::new(DIM)?
        .add_layer(32, Activation::ReLU, 1.0)?
        .add_layer(32, Activation::Tanh, 0.8)?
        .add_layer(CLASSES, Activation::Softmax, 0.9)?
        .optimizer(Optimizer::NesterovSgd)
        .lr(0.1)
        .momentum(0.5)
        .regularization(Regularization::L2, 1e-4)
        .init_std(0.1)
        .schedule(Schedule {
            lr_decay_every: Some(10),
            momentum_every: Some(5),
            ..Schedule::default()
        })
        .build_with_seed(0)?;

    for epoch in 0..EPOCHS {
        net.set_train_mode();
        train.shuffle(&mut rng);

        let mut total = 0.0;
        for chunk in train.chunks(BATCH) {
            let (x, y) = to_batch(chunk)?;
            let out = net.forward(&x, &mut rng)?;
            total += net.loss(&y)?;
            net.backward(&out, &y)?;
            net.step()?;
            net.reset_step_caches(true);
        }
        net.decay_schedule();
        net.bump_momentum();

        if epoch % 5 == 4 {
            let hp = net.hyperparams();
            println!(
                "epoch {:>3}: loss {:.4}  lr {:.4}  momentum {:.2}",
                epoch + 1,
                total / train.len() as f64,
                hp.lr,
                hp.momentum
            );
        }
    }

    net.set_evaluate_mode();
    let (x, _) = to_batch(&test)?;
    let predicted = net.predict(&x)?.argmax_columns();
    let correct = predicted
        .iter()
        .zip(test.iter().map(|(_, y)| *y))
        .filter(|&(&p, y)| p == y)
        .count();
    println!("test accuracy: {:.3}", correct as f64 / test.len() as f64);

    for d in net.weight_diagnostics() {
        println!(
            "layer {}: |W|_F = {:.3}, max eig(W Wt) = {:.3}",
            d.layer, d.frobenius_norm, d.max_eigenvalue
        );
    }
    Ok(())
}
