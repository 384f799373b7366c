#[cfg(not(feature = "serde"))]
fn main() {
    println!("enable the `serde` feature: cargo run --example save_load_json --features serde");
}

#[cfg(feature = "serde")]
fn main() -> rust_fcnet::Result<()> {
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_fcnet::{Activation, Matrix, ModelSnapshot, Network, NetworkBuilder, Optimizer};

    let build = |seed: u64| -> rust_fcnet::Result<Network> {
        NetworkBuilder::new(2)?
            .add_layer(8, Activation::ReLU, 1.0)?
            .add_layer(2, Activation::Softmax, 1.0)?
            .optimizer(Optimizer::Adam)
            .lr(1e-2)
            .momentum(0.9)
            .init_std(0.5)
            .build_with_seed(seed)
    };

    let x = Matrix::from_columns(&[
        vec![0.0, 0.0],
        vec![0.0, 1.0],
        vec![1.0, 0.0],
        vec![1.0, 1.0],
    ])?;
    let y = Matrix::one_hot(&[0, 1, 1, 0], 2)?;
    let mut rng = StdRng::seed_from_u64(0);

    let mut net = build(0)?;
    for _ in 0..200 {
        let out = net.forward(&x, &mut rng)?;
        net.backward(&out, &y)?;
        net.step()?;
        net.reset_step_caches(true);
    }

    let path = "target/tmp_fcnet_snapshot.json";
    net.snapshot_weights().save_json(path)?;

    let mut resumed = build(1)?;
    resumed.load_weights(ModelSnapshot::load_json(path)?)?;
    assert_eq!(resumed.predict(&x)?, net.predict(&x)?);
    println!(
        "saved and restored snapshot at step {}: {path}",
        resumed.optimizer_step()
    );
    Ok(())
}
