//! Minimal computer algebra core.
//!
//! Exact rational arithmetic over a closed expression grammar,
//! with canonicalization, expansion, substitution and differentiation.
//! Just enough to discretize linear weak forms.

pub mod builtins;
pub mod diff;
pub mod expr;
pub mod split;
pub mod transform;

pub use expr::{Expr, Func, Symbol};
pub use split::{split, split_one, Split, SplitOne};

pub type Rational = num_rational::BigRational;
