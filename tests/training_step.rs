use rand::SeedableRng;
use rand::rngs::StdRng;

use rust_fcnet::{
    Activation, Matrix, Network, NetworkBuilder, Optimizer, Regularization, Schedule,
};

const EPS: f64 = 1e-5;
const TOL: f64 = 1e-5;

fn rel_diff(numeric: f64, analytic: f64) -> f64 {
    (numeric - analytic).abs() / 1.0_f64.max(numeric.abs()).max(analytic.abs())
}

fn blobs(batch: usize, dim: usize, classes: usize, seed: u64) -> (Matrix, Matrix, Vec<usize>) {
    use rand::Rng;
    let mut rng = StdRng::seed_from_u64(seed);
    let mut columns = Vec::with_capacity(batch);
    let mut labels = Vec::with_capacity(batch);
    for i in 0..batch {
        let class = i % classes;
        let col = (0..dim)
            .map(|d| {
                let center = if d % classes == class { 1.5 } else { -0.5 };
                center + rng.gen_range(-0.5..0.5)
            })
            .collect();
        columns.push(col);
        labels.push(class);
    }
    let x = Matrix::from_columns(&columns).unwrap();
    let y = Matrix::one_hot(&labels, classes).unwrap();
    (x, y, labels)
}

/// Reseeds the dropout RNG before every forward so perturbed passes see the same masks.
fn check_gradients(net: &mut Network, x: &Matrix, y: &Matrix, mask_seed: u64, loss_scale: f64) {
    let out = net.forward(x, &mut StdRng::seed_from_u64(mask_seed)).unwrap();
    net.backward(&out, y).unwrap();
    let analytic = net.get_gradients();

    let mut checked = 0;
    for (layer, g) in analytic.iter().enumerate() {
        for row in 0..g.rows() {
            for col in 0..g.cols() {
                let w0 = net.weight_entry(layer, row, col).unwrap();

                net.set_weight_entry(layer, row, col, w0 + EPS).unwrap();
                net.forward(x, &mut StdRng::seed_from_u64(mask_seed)).unwrap();
                let plus = net.loss(y).unwrap();

                net.set_weight_entry(layer, row, col, w0 - EPS).unwrap();
                net.forward(x, &mut StdRng::seed_from_u64(mask_seed)).unwrap();
                let minus = net.loss(y).unwrap();

                net.set_weight_entry(layer, row, col, w0).unwrap();

                let numeric = (plus - minus) / (2.0 * EPS) * loss_scale;
                let a = g.get(row, col).unwrap();
                assert!(
                    rel_diff(numeric, a) <= TOL,
                    "layer {layer} ({row}, {col}): numeric {numeric} analytic {a}"
                );
                checked += 1;
            }
        }
    }
    assert!(checked > 0);
}

fn gradcheck_net(
    hidden: Activation,
    keep: f64,
    reg: Regularization,
    strength: f64,
    seed: u64,
) -> Network {
    NetworkBuilder::new(4)
        .unwrap()
        .add_layer(5, hidden, 1.0)
        .unwrap()
        .add_layer(3, Activation::Softmax, keep)
        .unwrap()
        .regularization(reg, strength)
        .init_std(0.5)
        .build_with_seed(seed)
        .unwrap()
}

#[test]
fn one_sgd_step_lowers_the_loss() {
    let mut net = NetworkBuilder::new(4)
        .unwrap()
        .add_layer(3, Activation::ReLU, 1.0)
        .unwrap()
        .add_layer(2, Activation::Softmax, 1.0)
        .unwrap()
        .optimizer(Optimizer::NesterovSgd)
        .lr(0.1)
        .init_std(0.5)
        .build_with_seed(3)
        .unwrap();

    let x = Matrix::from_columns(&[vec![1.0, 0.5, -0.2, 0.3], vec![-0.5, 1.2, 0.9, 0.0]]).unwrap();
    let y = Matrix::one_hot(&[0, 1], 2).unwrap();
    let mut rng = StdRng::seed_from_u64(0);

    let out = net.forward(&x, &mut rng).unwrap();
    let before = net.loss(&y).unwrap();
    net.backward(&out, &y).unwrap();
    net.step().unwrap();
    net.reset_step_caches(true);

    net.forward(&x, &mut rng).unwrap();
    let after = net.loss(&y).unwrap();
    assert!(after < before, "loss went from {before} to {after}");
}

#[test]
fn gradients_match_finite_differences_tanh() {
    let (x, y, _) = blobs(1, 4, 3, 11);
    let mut net = gradcheck_net(Activation::Tanh, 1.0, Regularization::L2, 0.0, 1);
    check_gradients(&mut net, &x, &y, 0, 1.0);
}

#[test]
fn gradients_match_finite_differences_relu() {
    let (x, y, _) = blobs(1, 4, 3, 12);
    let mut net = gradcheck_net(Activation::ReLU, 1.0, Regularization::L2, 0.0, 2);
    check_gradients(&mut net, &x, &y, 0, 1.0);
}

#[test]
fn gradients_include_l2_penalty() {
    let (x, y, _) = blobs(1, 4, 3, 13);
    let mut net = gradcheck_net(Activation::Tanh, 1.0, Regularization::L2, 0.05, 3);
    check_gradients(&mut net, &x, &y, 0, 1.0);
}

#[test]
fn gradients_include_l1_penalty() {
    let (x, y, _) = blobs(1, 4, 3, 14);
    let mut net = gradcheck_net(Activation::Tanh, 1.0, Regularization::L1, 0.01, 4);
    check_gradients(&mut net, &x, &y, 0, 1.0);
}

#[test]
fn gradients_flow_through_dropout_masks() {
    let (x, y, _) = blobs(1, 4, 3, 15);
    let mut net = gradcheck_net(Activation::Tanh, 0.6, Regularization::L2, 0.0, 5);
    check_gradients(&mut net, &x, &y, 42, 1.0);
}

#[test]
fn batch_gradient_is_mean_of_summed_loss() {
    let (x, y, _) = blobs(3, 4, 3, 16);
    let mut net = gradcheck_net(Activation::Tanh, 1.0, Regularization::L2, 0.0, 6);
    check_gradients(&mut net, &x, &y, 0, 1.0 / 3.0);
}

#[test]
fn evaluate_mode_is_deterministic_and_ignores_dropout() {
    let mut net = NetworkBuilder::new(4)
        .unwrap()
        .add_layer(6, Activation::ReLU, 0.5)
        .unwrap()
        .add_layer(3, Activation::Softmax, 0.5)
        .unwrap()
        .init_std(0.5)
        .build_with_seed(7)
        .unwrap();
    let (x, _, _) = blobs(5, 4, 3, 17);

    let a = net.forward(&x, &mut StdRng::seed_from_u64(1)).unwrap();
    let b = net.forward(&x, &mut StdRng::seed_from_u64(2)).unwrap();
    assert_ne!(a, b, "train mode should draw different masks");

    net.set_evaluate_mode();
    let a = net.forward(&x, &mut StdRng::seed_from_u64(1)).unwrap();
    let b = net.forward(&x, &mut StdRng::seed_from_u64(2)).unwrap();
    assert_eq!(a.as_slice(), b.as_slice());
    assert_eq!(a, net.predict(&x).unwrap());
}

#[test]
fn shapes_survive_training() {
    for optimizer in [Optimizer::NesterovSgd, Optimizer::Adam] {
        let mut net = NetworkBuilder::new(4)
            .unwrap()
            .add_layer(7, Activation::Tanh, 0.8)
            .unwrap()
            .add_layer(5, Activation::ReLU, 0.9)
            .unwrap()
            .add_layer(3, Activation::Softmax, 1.0)
            .unwrap()
            .optimizer(optimizer)
            .lr(0.05)
            .momentum(0.5)
            .regularization(Regularization::L2, 1e-3)
            .build_with_seed(8)
            .unwrap();
        let expected = vec![(5, 7), (8, 5), (6, 3)];
        let mut rng = StdRng::seed_from_u64(8);

        for batch in [1, 4, 9] {
            let (x, y, _) = blobs(batch, 4, 3, batch as u64);
            let out = net.forward(&x, &mut rng).unwrap();
            assert_eq!(out.shape(), (3, batch));
            net.backward(&out, &y).unwrap();
            net.step().unwrap();
            net.reset_step_caches(true);
        }

        let snap = net.snapshot_weights();
        for buffers in [&snap.weights, &snap.first_moment, &snap.second_moment] {
            let shapes: Vec<_> = buffers.iter().map(Matrix::shape).collect();
            assert_eq!(shapes, expected);
        }
        let grads: Vec<_> = net.get_gradients().iter().map(Matrix::shape).collect();
        assert_eq!(grads, expected);
        assert!(snap.weights.iter().all(Matrix::is_finite));
        assert_eq!(net.optimizer_step(), 3);
    }
}

#[test]
fn identical_seeds_give_identical_training() {
    for optimizer in [Optimizer::NesterovSgd, Optimizer::Adam] {
        let build = || {
            NetworkBuilder::new(4)
                .unwrap()
                .add_layer(6, Activation::ReLU, 0.7)
                .unwrap()
                .add_layer(3, Activation::Softmax, 1.0)
                .unwrap()
                .optimizer(optimizer)
                .lr(0.01)
                .momentum(0.9)
                .build_with_seed(21)
                .unwrap()
        };
        let (x, y, _) = blobs(6, 4, 3, 21);

        let mut a = build();
        let mut b = build();
        let mut rng_a = StdRng::seed_from_u64(5);
        let mut rng_b = StdRng::seed_from_u64(5);
        for _ in 0..5 {
            for (net, rng) in [(&mut a, &mut rng_a), (&mut b, &mut rng_b)] {
                let out = net.forward(&x, rng).unwrap();
                net.backward(&out, &y).unwrap();
                net.step().unwrap();
                net.reset_step_caches(true);
            }
        }
        assert_eq!(a.get_weights(), b.get_weights());
    }
}

#[test]
fn adam_warm_start_continues_identically() {
    let build = |seed| {
        NetworkBuilder::new(4)
            .unwrap()
            .add_layer(5, Activation::Tanh, 1.0)
            .unwrap()
            .add_layer(3, Activation::Softmax, 1.0)
            .unwrap()
            .optimizer(Optimizer::Adam)
            .lr(1e-2)
            .momentum(0.9)
            .regularization(Regularization::L2, 1e-3)
            .build_with_seed(seed)
            .unwrap()
    };
    let (x, y, _) = blobs(4, 4, 3, 30);
    let mut rng = StdRng::seed_from_u64(0);

    let mut trained = build(1);
    for _ in 0..3 {
        let out = trained.forward(&x, &mut rng).unwrap();
        trained.backward(&out, &y).unwrap();
        trained.step().unwrap();
        trained.reset_step_caches(true);
    }

    let mut resumed = build(2);
    resumed.load_weights(trained.snapshot_weights()).unwrap();
    assert_eq!(resumed.optimizer_step(), 3);

    for net in [&mut trained, &mut resumed] {
        let out = net.forward(&x, &mut rng).unwrap();
        net.backward(&out, &y).unwrap();
        net.step().unwrap();
    }
    assert_eq!(trained.get_weights(), resumed.get_weights());
}

#[test]
fn schedules_run_on_their_cadence() {
    let schedule = Schedule {
        lr_decay_every: Some(2),
        min_lr: 0.02,
        momentum_every: Some(3),
        momentum_increment: 0.2,
        max_momentum: 0.75,
    };
    let mut net = NetworkBuilder::new(2)
        .unwrap()
        .add_layer(2, Activation::Softmax, 1.0)
        .unwrap()
        .lr(0.1)
        .momentum(0.5)
        .schedule(schedule)
        .build_with_seed(0)
        .unwrap();

    let mut lrs = Vec::new();
    let mut momenta = Vec::new();
    for _ in 0..6 {
        net.decay_schedule();
        net.bump_momentum();
        lrs.push(net.hyperparams().lr);
        momenta.push(net.hyperparams().momentum);
    }
    assert_eq!(net.epoch(), 6);
    assert_eq!(lrs, vec![0.1, 0.05, 0.05, 0.025, 0.025, 0.02]);
    assert!((momenta[2] - 0.7).abs() < 1e-12);
    assert_eq!(momenta[5], 0.75);
    assert_eq!(momenta[0], 0.5);
}

#[test]
fn diagnostics_cover_every_layer() {
    let net = NetworkBuilder::new(4)
        .unwrap()
        .add_layer(6, Activation::Tanh, 1.0)
        .unwrap()
        .add_layer(3, Activation::Softmax, 1.0)
        .unwrap()
        .build_with_seed(0)
        .unwrap();
    let diags = net.weight_diagnostics();
    assert_eq!(diags.len(), 2);
    for (d, w) in diags.iter().zip(net.get_weights()) {
        assert!((d.frobenius_norm - w.frobenius_norm()).abs() < 1e-15);
        // Top eigenvalue of W·Wᵀ is bounded by its trace, ‖W‖_F².
        assert!(d.max_eigenvalue > 0.0);
        assert!(d.max_eigenvalue <= d.frobenius_norm.powi(2) * (1.0 + 1e-9));
    }
}
