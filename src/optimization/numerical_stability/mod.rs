//! numerical_stability — guarded transforms and shared tolerances.
//!
//! Purpose
//! -------
//! Centralize the small numerical tolerances and decay transforms used by the
//! allocation layer so every allocator applies the same guards when turning
//! metrics into adjustment factors or dividing by global totals.
//!
//! Key behaviors
//! -------------
//! - Provide the three adjustment forms (`asinh_decay`, `power_decay`,
//!   `linear_decay`) with clamps that keep factors positive and finite.
//! - Provide `guarded_ratio`, which reports degenerate denominators as
//!   `None` instead of producing NaN or ±∞.
//! - Share the tolerances `DEGENERACY_EPS`, `SHARE_SUM_TOL`,
//!   `CUMULATIVE_REL_TOL` and `LINEAR_FACTOR_FLOOR`.
//!
//! Conventions
//! -----------
//! - All helpers are pure scalar functions; they never log or allocate.
//! - Domain validation (weights, exponents) happens upstream in the
//!   allocation options, not here.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    CUMULATIVE_REL_TOL, DEGENERACY_EPS, LINEAR_FACTOR_FLOOR, SHARE_SUM_TOL, asinh_decay,
    guarded_ratio, linear_decay, power_decay,
};

pub mod prelude {
    pub use super::transformations::{
        CUMULATIVE_REL_TOL, DEGENERACY_EPS, SHARE_SUM_TOL, guarded_ratio,
    };
}
