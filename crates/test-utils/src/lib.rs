//! Test support shared by the workspace crates.
//!
//! [`generators`] builds synthetic MOSMIX documents and KMZ bundles,
//! [`fixtures`] holds small payloads in the formats of the other upstream
//! sources. Both are meant for `[dev-dependencies]` only.

pub mod fixtures;
pub mod generators;

pub use fixtures::*;
pub use generators::*;

/// Assert that two numbers differ by at most `epsilon`. Both sides are
/// compared as `f64`.
///
/// ```
/// test_utils::assert_approx_eq!(276.55, 3.4 + 273.15, 1e-9);
/// ```
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let (left, right) = ($left as f64, $right as f64);
        let epsilon = $epsilon as f64;
        assert!(
            (left - right).abs() <= epsilon,
            "{} and {} differ by more than {}",
            left,
            right,
            epsilon
        );
    }};
}
