pub extern crate rustfft;

// export rustfft to phastplan
use rand::{distributions::Uniform, prelude::*};
use rustfft::num_complex::Complex;
use rustfft::num_traits::Float;
use rustfft::{FftNum, FftPlanner};

/// Asserts that two fp numbers are approximately equal.
///
/// # Panics
///
/// Panics if `actual` and `expected` are too far from each other
#[allow(dead_code)]
#[track_caller]
pub fn assert_float_closeness<T: Float + std::fmt::Display>(actual: T, expected: T, epsilon: T) {
    if (actual - expected).abs() >= epsilon {
        panic!(
            "Assertion failed: {actual} too far from expected value {expected} (with epsilon {epsilon})",
        );
    }
}

/// Asserts that both components of two complex numbers are approximately equal.
///
/// # Panics
///
/// Panics if either component of `actual` is too far from `expected`
#[track_caller]
pub fn assert_complex_closeness<T: Float + std::fmt::Display>(
    actual: Complex<T>,
    expected: Complex<T>,
    epsilon: T,
) {
    if (actual.re - expected.re).abs() >= epsilon || (actual.im - expected.im).abs() >= epsilon {
        panic!(
            "Assertion failed: {actual} too far from expected value {expected} (with epsilon {epsilon})",
        );
    }
}

/// `O(n^2)` DFT evaluated in `f64`. The inverse is not normalized.
pub fn naive_dft<T: Float>(input: &[Complex<T>], inverse: bool) -> Vec<Complex<T>> {
    let n = input.len();
    let sign = if inverse { 1.0 } else { -1.0 };
    let to_f64 = |z: &Complex<T>| {
        Complex::new(
            z.re.to_f64().unwrap_or(f64::NAN),
            z.im.to_f64().unwrap_or(f64::NAN),
        )
    };

    (0..n)
        .map(|k| {
            let acc = input
                .iter()
                .enumerate()
                .fold(Complex::new(0.0_f64, 0.0), |acc, (j, z)| {
                    let angle =
                        sign * 2.0 * std::f64::consts::PI * ((j * k) % n) as f64 / n as f64;
                    acc + to_f64(z) * Complex::from_polar(1.0, angle)
                });
            Complex::new(
                T::from(acc.re).unwrap_or_else(T::nan),
                T::from(acc.im).unwrap_or_else(T::nan),
            )
        })
        .collect()
}

/// Reference transform computed by `rustfft`. The inverse is not normalized.
pub fn reference_fft<T: FftNum>(input: &[Complex<T>], inverse: bool) -> Vec<Complex<T>> {
    let mut planner = FftPlanner::new();
    let fft = if inverse {
        planner.plan_fft_inverse(input.len())
    } else {
        planner.plan_fft_forward(input.len())
    };

    let mut buffer = input.to_vec();
    fft.process(&mut buffer);
    buffer
}

/// Fill `signal` with values drawn uniformly from `[-1, 1)` in both components
pub fn gen_random_signal<T>(signal: &mut [Complex<T>])
where
    T: Float + rand::distributions::uniform::SampleUniform,
{
    let mut rng = thread_rng();

    let uniform_dist = Uniform::new(T::from(-1.0).unwrap(), T::from(1.0).unwrap());
    for z in signal.iter_mut() {
        z.re = uniform_dist.sample(&mut rng);
        z.im = uniform_dist.sample(&mut rng);
    }
}
