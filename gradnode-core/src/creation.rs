use crate::value::Array;
use ndarray::IxDyn;
use rand::distributions::{Distribution, Uniform};
use rand::Rng;

/// Creates an array of the given shape filled with samples from `[0, 1)`.
///
/// # Examples
/// ```
/// use gradnode_core::creation::rand_uniform;
/// use rand::SeedableRng;
///
/// let mut rng = rand::rngs::StdRng::seed_from_u64(0);
/// let a = rand_uniform(&[2, 3], &mut rng);
/// assert_eq!(a.shape(), &[2, 3]);
/// assert!(a.iter().all(|&v| (0.0..1.0).contains(&v)));
/// ```
pub fn rand_uniform<R: Rng + ?Sized>(shape: &[usize], rng: &mut R) -> Array {
    rand_range(shape, 0.0, 1.0, rng)
}

/// Creates an array of the given shape filled with samples from `[low, high)`.
pub fn rand_range<R: Rng + ?Sized>(shape: &[usize], low: f64, high: f64, rng: &mut R) -> Array {
    let dist = Uniform::new(low, high);
    Array::from_shape_simple_fn(IxDyn(shape), || dist.sample(rng))
}
