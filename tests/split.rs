//! Affine/linear/nonlinear decomposition.
//!
//! All comparisons are exact, on the canonical expanded form.

use covolume::{
  symbolic::{split, split_one, Expr, Symbol},
  Error,
};

fn syms<const N: usize>(names: [&str; N]) -> ([Symbol; N], [Expr; N]) {
  let symbols = names.map(Symbol::new);
  let exprs = symbols.clone().map(Expr::from);
  (symbols, exprs)
}

#[test]
fn linear_expression_is_reconstructed() {
  let ([u, v], [ue, ve]) = syms(["u", "v"]);
  let [a, b] = [Expr::sym("a"), Expr::sym("b")];

  let e = (a.clone() + ue.clone()) * (b.clone() + 3) - ve.clone() * a.clone() / 2;
  let s = split(&e, &[u, v]);

  assert_eq!(s.affine, (a.clone() * b.clone() + 3 * a.clone()).expand());
  assert_eq!(s.linear, vec![b + 3, -a / 2]);
  assert!(s.nonlinear.is_zero());

  let rebuilt = s.affine.clone()
    + ue * s.linear[0].clone()
    + ve * s.linear[1].clone();
  assert_eq!(rebuilt.expand(), e.expand());
}

#[test]
fn higher_degree_terms_are_the_residual() {
  let ([u, v], [ue, ve]) = syms(["u", "v"]);
  let c = Expr::sym("c");

  let e = c.clone() + ue.clone() + 2 * ue.clone() * ve.clone() + c.clone() * ue.clone().powi(2);
  let s = split(&e, &[u, v]);

  assert_eq!(s.affine, c.clone());
  assert_eq!(s.linear, vec![Expr::one(), Expr::zero()]);
  assert_eq!(s.nonlinear, 2 * ue.clone() * ve + c * ue.powi(2));
}

#[test]
fn pointwise_nonlinearity() {
  let ([u], [ue]) = syms(["u"]);
  let c = Expr::sym("c");
  let e = c.clone() * Expr::call("exp", [ue.clone()]) + 1;
  let s = split_one(&e, &u);
  assert_eq!(s.affine, Expr::one());
  assert!(s.linear.is_zero());
  assert_eq!(s.nonlinear, c * Expr::call("exp", [ue]));
}

#[test]
fn exact_rational_coefficients() {
  let ([u], [ue]) = syms(["u"]);
  let e = ue.clone() / 3 + Expr::ratio(1, 6) + ue / 6;
  let s = split_one(&e, &u);
  assert_eq!(s.affine, Expr::ratio(1, 6));
  assert_eq!(s.linear, Expr::ratio(1, 2));
}

#[test]
fn nonlinear_residual_is_rejected() {
  let ([u], [ue]) = syms(["u"]);
  let e = ue.clone() * ue.clone();
  let err = split(&e, &[u.clone()]).into_linear("u^2").unwrap_err();
  match err {
    Error::NonLinear { context, residual } => {
      assert_eq!(context, "u^2");
      assert_eq!(residual, "u^2");
    }
    other => panic!("unexpected error {other}"),
  }

  let ok = split_one(&(3 * ue + 1), &u).into_linear("3u + 1").unwrap();
  assert_eq!(ok.linear, Expr::int(3));
}
