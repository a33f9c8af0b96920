//! End-to-end behaviour of the planner through the public API.
use phastplan::{
    build_twiddles, engine, AlgorithmFamily, CapabilityVector, CodeletRegistry, Complex,
    DecomposeStrategy, Direction, FftNum, Plan, PlannerOptions, PlannerSession, Precision, SimdTier,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use utilities::{assert_complex_closeness, gen_random_signal, naive_dft, reference_fft};

fn baseline_session() -> PlannerSession {
    let session = PlannerSession::new();
    session.override_capabilities(CapabilityVector::baseline());
    session
}

#[test]
fn impulse_and_ones_are_duals() {
    for session in [baseline_session(), PlannerSession::new()] {
        let plan = Plan::<f64>::with_session(8, &session).unwrap();
        let mut scratch = vec![Complex::default(); plan.inplace_scratch_len()];

        let mut impulse = vec![Complex::new(0.0, 0.0); 8];
        impulse[0] = Complex::new(1.0, 0.0);
        plan.process(&mut impulse, &mut scratch, Direction::Forward).unwrap();
        for z in &impulse {
            assert_complex_closeness(*z, Complex::new(1.0, 0.0), 1e-6);
        }

        let mut ones = vec![Complex::new(1.0, 0.0); 8];
        plan.process(&mut ones, &mut scratch, Direction::Reverse).unwrap();
        assert_complex_closeness(ones[0], Complex::new(1.0, 0.0), 1e-6);
        for z in &ones[1..] {
            assert_complex_closeness(*z, Complex::new(0.0, 0.0), 1e-6);
        }
    }
}

#[test]
fn size_1001_uses_bluestein() {
    let session = baseline_session();
    assert_eq!(session.resolve(1001, Precision::Complex64), AlgorithmFamily::Bluestein);

    let plan = Plan::<f32>::with_session(1001, &session).unwrap();
    assert_eq!(plan.family(), AlgorithmFamily::Bluestein);
    assert!(plan.strategy().is_none());
}

#[test]
fn impulse_1024_over_a_512_codelet() {
    let registry = CodeletRegistry::<f64>::with_builtin_codelets();
    let strategy = DecomposeStrategy::plan(1024, &[512], 1 << 20);
    let root = strategy.node(strategy.root());
    assert_eq!((root.radix, root.sub_size, root.num_children()), (2, 512, 2));
    for &child in &root.children {
        assert!(strategy.node(child).is_leaf());
        assert_eq!(strategy.node(child).size, 512);
    }

    let mut src = vec![Complex::new(0.0, 0.0); 1024];
    src[0] = Complex::new(1.0, 0.0);
    let twiddles = build_twiddles::<f64>(&strategy);
    let mut dst = vec![Complex::default(); 1024];
    let mut scratch = vec![Complex::default(); strategy.scratch_len()];

    let caps = CapabilityVector::detect();
    assert!(engine::forward(&mut dst, &src, &strategy, &twiddles, &mut scratch, &registry, &caps));
    for (actual, expected) in dst.iter().zip(naive_dft(&src, false)) {
        assert_complex_closeness(*actual, expected, 1e-5);
    }
}

#[test]
fn decomposition_depth_and_leaf_sums_for_random_sizes() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let codelets = f64::registry().available_sizes(&CapabilityVector::baseline());

    for _ in 0..200 {
        let len = rng.gen_range(1..1 << 16);
        let cache = 1 << rng.gen_range(10..24);
        let strategy = DecomposeStrategy::plan(len, &codelets, cache);

        assert_eq!(strategy.leaf_sizes().iter().sum::<usize>(), len);
        assert_eq!(strategy.radix_path().iter().product::<usize>() * strategy.leaf_size(), len);
        assert!(strategy.radix_path().iter().all(|r| [2, 3, 4, 5, 8].contains(r)));
        if len.is_power_of_two() && len > 1024 {
            let log_ratio = (len / 1024).ilog2() as usize;
            assert!(strategy.depth() >= log_ratio.div_ceil(3));
        }
    }
}

#[test]
fn random_sizes_match_rustfft() {
    let mut rng = StdRng::seed_from_u64(42);
    let session = baseline_session();

    for _ in 0..40 {
        let len = rng.gen_range(1..5000);
        let plan = Plan::<f64>::with_session(len, &session).unwrap();
        let mut src = vec![Complex::default(); len];
        gen_random_signal(&mut src);
        let mut dst = vec![Complex::default(); len];
        let mut scratch = vec![Complex::default(); plan.scratch_len()];

        plan.forward(&src, &mut dst, &mut scratch).unwrap();
        for (actual, expected) in dst.iter().zip(reference_fft(&src, false)) {
            assert_complex_closeness(*actual, expected, 1e-8);
        }

        let mut back = vec![Complex::default(); len];
        plan.inverse(&dst, &mut back, &mut scratch).unwrap();
        for (actual, expected) in back.iter().zip(src.iter()) {
            assert_complex_closeness(*actual, *expected, 1e-10);
        }
    }
}

#[test]
fn forced_tiers_give_identical_answers() {
    let len = 1 << 14;
    let mut src = vec![Complex::default(); len];
    gen_random_signal(&mut src);
    let expected = reference_fft(&src, false);

    for tier in SimdTier::ALL {
        for force_generic in [false, true] {
            let session = PlannerSession::new();
            let caps = CapabilityVector::with_only(tier).with_force_generic(force_generic);
            session.override_capabilities(caps);
            let plan = Plan::<f64>::with_session(len, &session).unwrap();
            assert!(plan.capabilities().max_tier() <= tier);

            let mut dst = vec![Complex::default(); len];
            let mut scratch = vec![Complex::default(); plan.scratch_len()];
            plan.forward(&src, &mut dst, &mut scratch).unwrap();
            for (actual, expected) in dst.iter().zip(expected.iter()) {
                assert_complex_closeness(*actual, *expected, 1e-8);
            }
        }
    }
}

#[test]
fn wisdom_steers_plans_and_survives_a_file_round_trip() {
    let exporter = baseline_session();
    exporter.store_wisdom(4096, Precision::Complex128, AlgorithmFamily::SixStep);
    exporter.store_wisdom(3000, Precision::Complex128, AlgorithmFamily::Bluestein);
    exporter.store_wisdom(2048, Precision::Complex64, AlgorithmFamily::EightStep);

    let file_name = format!("phastplan-scenario-{}.jsonl", std::process::id());
    let path = std::env::temp_dir().join(file_name);
    exporter.export_wisdom(&path).unwrap();

    let importer = baseline_session();
    assert_eq!(importer.import_wisdom(&path).unwrap(), 3);
    std::fs::remove_file(&path).unwrap();
    assert_eq!(importer.wisdom().keys(), exporter.wisdom().keys());

    let family_64 = |len| Plan::<f64>::with_session(len, &importer).unwrap().family();
    let family_32 = |len| Plan::<f32>::with_session(len, &importer).unwrap().family();
    assert_eq!(family_64(4096), AlgorithmFamily::SixStep);
    assert_eq!(family_64(3000), AlgorithmFamily::Bluestein);
    // eight-step cannot serve 2048
    assert_eq!(family_32(2048), AlgorithmFamily::Recursive);
}

#[test]
fn small_caches_switch_large_squares_to_six_and_eight_step() {
    let session = PlannerSession::with_options(PlannerOptions::from_cache_size(1 << 12));
    session.override_capabilities(CapabilityVector::baseline());
    // 256 elements of cache: six-step from 1024, eight-step from 16384
    assert_eq!(session.resolve(1 << 10, Precision::Complex64), AlgorithmFamily::SixStep);
    assert_eq!(session.resolve(1 << 14, Precision::Complex64), AlgorithmFamily::EightStep);
    assert_eq!(session.resolve(1 << 13, Precision::Complex64), AlgorithmFamily::Recursive);

    let plan = Plan::<f32>::with_session(1 << 14, &session).unwrap();
    let mut src = vec![Complex::default(); 1 << 14];
    gen_random_signal(&mut src);
    let mut spectrum = vec![Complex::default(); 1 << 14];
    let mut back = vec![Complex::default(); 1 << 14];
    let mut scratch = vec![Complex::default(); plan.scratch_len()];
    plan.forward(&src, &mut spectrum, &mut scratch).unwrap();
    plan.inverse(&spectrum, &mut back, &mut scratch).unwrap();
    for (actual, expected) in back.iter().zip(src.iter()) {
        assert_complex_closeness(*actual, *expected, 1e-4);
    }
}
