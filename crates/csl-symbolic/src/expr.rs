//! Immutable expression trees over named real symbols.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{SymbolicError, SymbolicResult};

/// Elementary functions admitted by the grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Func {
    Sin,
    Cos,
    Exp,
    Ln,
    Sqrt,
}

impl Func {
    pub const ALL: [Func; 5] = [Func::Sin, Func::Cos, Func::Exp, Func::Ln, Func::Sqrt];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Func::Sin => "sin",
            Func::Cos => "cos",
            Func::Exp => "exp",
            Func::Ln => "ln",
            Func::Sqrt => "sqrt",
        }
    }

    pub fn apply(self, v: f64) -> f64 {
        match self {
            Func::Sin => v.sin(),
            Func::Cos => v.cos(),
            Func::Exp => v.exp(),
            Func::Ln => v.ln(),
            Func::Sqrt => v.sqrt(),
        }
    }
}

/// Expression tree.
///
/// Build through the associated constructors (`Expr::add`, `Expr::mul`, ...)
/// to get constant folding and the 0/1 identities applied on the way up.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Num(f64),
    Sym(String),
    Neg(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Pow(Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

fn folded(v: f64) -> Option<Expr> {
    v.is_finite().then_some(Expr::Num(v))
}

impl Expr {
    pub fn num(v: f64) -> Self {
        Expr::Num(v)
    }

    pub fn sym(name: impl Into<String>) -> Self {
        Expr::Sym(name.into())
    }

    fn as_num(&self) -> Option<f64> {
        match self {
            Expr::Num(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.as_num() == Some(0.0)
    }

    pub fn is_one(&self) -> bool {
        self.as_num() == Some(1.0)
    }

    pub fn neg(a: Expr) -> Self {
        match a {
            Expr::Num(v) => Expr::Num(-v),
            Expr::Neg(inner) => *inner,
            other => Expr::Neg(Box::new(other)),
        }
    }

    pub fn add(a: Expr, b: Expr) -> Self {
        if let (Some(x), Some(y)) = (a.as_num(), b.as_num()) {
            if let Some(e) = folded(x + y) {
                return e;
            }
        }
        if a.is_zero() {
            return b;
        }
        if b.is_zero() {
            return a;
        }
        if let Expr::Neg(nb) = b {
            return Expr::sub(a, *nb);
        }
        Expr::Add(Box::new(a), Box::new(b))
    }

    pub fn sub(a: Expr, b: Expr) -> Self {
        if let (Some(x), Some(y)) = (a.as_num(), b.as_num()) {
            if let Some(e) = folded(x - y) {
                return e;
            }
        }
        if b.is_zero() {
            return a;
        }
        if a.is_zero() {
            return Expr::neg(b);
        }
        if a == b {
            return Expr::Num(0.0);
        }
        Expr::Sub(Box::new(a), Box::new(b))
    }

    pub fn mul(a: Expr, b: Expr) -> Self {
        if let (Some(x), Some(y)) = (a.as_num(), b.as_num()) {
            if let Some(e) = folded(x * y) {
                return e;
            }
        }
        if a.is_zero() || b.is_zero() {
            return Expr::Num(0.0);
        }
        if a.is_one() {
            return b;
        }
        if b.is_one() {
            return a;
        }
        if a.as_num() == Some(-1.0) {
            return Expr::neg(b);
        }
        if b.as_num() == Some(-1.0) {
            return Expr::neg(a);
        }
        // Keep signs at the top so `add` can turn them into subtractions
        if let Expr::Neg(na) = a {
            return Expr::neg(Expr::mul(*na, b));
        }
        if let Expr::Neg(nb) = b {
            return Expr::neg(Expr::mul(a, *nb));
        }
        Expr::Mul(Box::new(a), Box::new(b))
    }

    pub fn div(a: Expr, b: Expr) -> Self {
        if let (Some(x), Some(y)) = (a.as_num(), b.as_num()) {
            if let Some(e) = folded(x / y) {
                return e;
            }
        }
        if b.is_one() {
            return a;
        }
        if a.is_zero() && !b.is_zero() {
            return Expr::Num(0.0);
        }
        Expr::Div(Box::new(a), Box::new(b))
    }

    pub fn pow(base: Expr, exp: Expr) -> Self {
        if let (Some(x), Some(y)) = (base.as_num(), exp.as_num()) {
            if let Some(e) = folded(x.powf(y)) {
                return e;
            }
        }
        if exp.is_zero() {
            return Expr::Num(1.0);
        }
        if exp.is_one() {
            return base;
        }
        if base.is_one() {
            return Expr::Num(1.0);
        }
        Expr::Pow(Box::new(base), Box::new(exp))
    }

    pub fn call(f: Func, arg: Expr) -> Self {
        if let Some(x) = arg.as_num() {
            if let Some(e) = folded(f.apply(x)) {
                return e;
            }
        }
        Expr::Call(f, Box::new(arg))
    }

    /// Rebuild bottom-up through the simplifying constructors.
    pub fn simplify(&self) -> Expr {
        self.map_leaves(&|e| e.clone())
    }

    /// Rebuild the tree with `leaf` applied to every number and symbol.
    fn map_leaves(&self, leaf: &dyn Fn(&Expr) -> Expr) -> Expr {
        match self {
            Expr::Num(_) | Expr::Sym(_) => leaf(self),
            Expr::Neg(a) => Expr::neg(a.map_leaves(leaf)),
            Expr::Add(a, b) => Expr::add(a.map_leaves(leaf), b.map_leaves(leaf)),
            Expr::Sub(a, b) => Expr::sub(a.map_leaves(leaf), b.map_leaves(leaf)),
            Expr::Mul(a, b) => Expr::mul(a.map_leaves(leaf), b.map_leaves(leaf)),
            Expr::Div(a, b) => Expr::div(a.map_leaves(leaf), b.map_leaves(leaf)),
            Expr::Pow(a, b) => Expr::pow(a.map_leaves(leaf), b.map_leaves(leaf)),
            Expr::Call(f, a) => Expr::call(*f, a.map_leaves(leaf)),
        }
    }

    /// Replace symbols by expressions; unbound symbols are kept.
    pub fn substitute(&self, bindings: &BTreeMap<String, Expr>) -> Expr {
        self.map_leaves(&|e| match e {
            Expr::Sym(name) => bindings.get(name).cloned().unwrap_or_else(|| e.clone()),
            _ => e.clone(),
        })
    }

    /// Replace symbols by numbers; unbound symbols are kept.
    pub fn substitute_values(&self, values: &BTreeMap<String, f64>) -> Expr {
        self.map_leaves(&|e| match e {
            Expr::Sym(name) => values.get(name).map_or_else(|| e.clone(), |v| Expr::Num(*v)),
            _ => e.clone(),
        })
    }

    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_symbols(&mut out);
        out
    }

    fn collect_symbols(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Num(_) => {}
            Expr::Sym(name) => {
                out.insert(name.clone());
            }
            Expr::Neg(a) | Expr::Call(_, a) => a.collect_symbols(out),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => {
                a.collect_symbols(out);
                b.collect_symbols(out);
            }
        }
    }

    pub fn contains_symbol(&self, var: &str) -> bool {
        match self {
            Expr::Num(_) => false,
            Expr::Sym(name) => name == var,
            Expr::Neg(a) | Expr::Call(_, a) => a.contains_symbol(var),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Div(a, b)
            | Expr::Pow(a, b) => a.contains_symbol(var) || b.contains_symbol(var),
        }
    }

    /// Symbolic derivative with respect to `var`.
    pub fn diff(&self, var: &str) -> Expr {
        match self {
            Expr::Num(_) => Expr::Num(0.0),
            Expr::Sym(name) => Expr::Num(if name == var { 1.0 } else { 0.0 }),
            Expr::Neg(a) => Expr::neg(a.diff(var)),
            Expr::Add(a, b) => Expr::add(a.diff(var), b.diff(var)),
            Expr::Sub(a, b) => Expr::sub(a.diff(var), b.diff(var)),
            Expr::Mul(a, b) => Expr::add(
                Expr::mul(a.diff(var), (**b).clone()),
                Expr::mul((**a).clone(), b.diff(var)),
            ),
            Expr::Div(a, b) => Expr::div(
                Expr::sub(
                    Expr::mul(a.diff(var), (**b).clone()),
                    Expr::mul((**a).clone(), b.diff(var)),
                ),
                Expr::pow((**b).clone(), Expr::Num(2.0)),
            ),
            Expr::Pow(a, b) if !b.contains_symbol(var) => Expr::mul(
                Expr::mul(
                    (**b).clone(),
                    Expr::pow((**a).clone(), Expr::sub((**b).clone(), Expr::Num(1.0))),
                ),
                a.diff(var),
            ),
            // d(a^b) = a^b * (b' ln a + b a' / a)
            Expr::Pow(a, b) => Expr::mul(
                self.clone(),
                Expr::add(
                    Expr::mul(b.diff(var), Expr::call(Func::Ln, (**a).clone())),
                    Expr::div(Expr::mul((**b).clone(), a.diff(var)), (**a).clone()),
                ),
            ),
            Expr::Call(f, a) => {
                let inner = a.diff(var);
                let outer = match f {
                    Func::Sin => Expr::call(Func::Cos, (**a).clone()),
                    Func::Cos => Expr::neg(Expr::call(Func::Sin, (**a).clone())),
                    Func::Exp => self.clone(),
                    Func::Ln => Expr::div(Expr::Num(1.0), (**a).clone()),
                    Func::Sqrt => Expr::div(Expr::Num(0.5), self.clone()),
                };
                Expr::mul(outer, inner)
            }
        }
    }

    /// Evaluate with every free symbol bound in `values`.
    pub fn eval(&self, values: &BTreeMap<String, f64>) -> SymbolicResult<f64> {
        let unbound: Vec<String> = self
            .free_symbols()
            .into_iter()
            .filter(|s| !values.contains_key(s))
            .collect();
        if !unbound.is_empty() {
            return Err(SymbolicError::FreeSymbols { symbols: unbound });
        }
        Ok(self.eval_bound(values))
    }

    fn eval_bound(&self, values: &BTreeMap<String, f64>) -> f64 {
        match self {
            Expr::Num(v) => *v,
            Expr::Sym(name) => values.get(name).copied().unwrap_or(f64::NAN),
            Expr::Neg(a) => -a.eval_bound(values),
            Expr::Add(a, b) => a.eval_bound(values) + b.eval_bound(values),
            Expr::Sub(a, b) => a.eval_bound(values) - b.eval_bound(values),
            Expr::Mul(a, b) => a.eval_bound(values) * b.eval_bound(values),
            Expr::Div(a, b) => a.eval_bound(values) / b.eval_bound(values),
            Expr::Pow(a, b) => a.eval_bound(values).powf(b.eval_bound(values)),
            Expr::Call(f, a) => f.apply(a.eval_bound(values)),
        }
    }

    /// Binding strength used when printing.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Add(..) | Expr::Sub(..) => 1,
            Expr::Mul(..) | Expr::Div(..) => 2,
            Expr::Neg(_) => 3,
            Expr::Num(v) if v.is_sign_negative() => 3,
            Expr::Pow(..) => 4,
            Expr::Num(_) | Expr::Sym(_) | Expr::Call(..) => 5,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(v) => write!(f, "{v}"),
            Expr::Sym(name) => write!(f, "{name}"),
            Expr::Neg(a) => {
                write!(f, "-")?;
                a.fmt_operand(f, 3)
            }
            Expr::Add(a, b) => {
                a.fmt_operand(f, 1)?;
                write!(f, " + ")?;
                b.fmt_operand(f, 2)
            }
            Expr::Sub(a, b) => {
                a.fmt_operand(f, 1)?;
                write!(f, " - ")?;
                b.fmt_operand(f, 2)
            }
            Expr::Mul(a, b) => {
                a.fmt_operand(f, 2)?;
                write!(f, "*")?;
                b.fmt_operand(f, 3)
            }
            Expr::Div(a, b) => {
                a.fmt_operand(f, 2)?;
                write!(f, "/")?;
                b.fmt_operand(f, 3)
            }
            Expr::Pow(a, b) => {
                a.fmt_operand(f, 5)?;
                write!(f, "^")?;
                b.fmt_operand(f, 3)
            }
            Expr::Call(func, a) => write!(f, "{}({a})", func.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expr {
        Expr::sym("x")
    }

    #[test]
    fn constant_folding_and_identities() {
        assert_eq!(Expr::add(Expr::num(2.0), Expr::num(3.0)), Expr::num(5.0));
        assert_eq!(Expr::mul(Expr::num(1.0), x()), x());
        assert_eq!(Expr::mul(x(), Expr::num(0.0)), Expr::num(0.0));
        assert_eq!(Expr::pow(x(), Expr::num(1.0)), x());
        assert_eq!(Expr::sub(x(), x()), Expr::num(0.0));
        assert_eq!(Expr::neg(Expr::neg(x())), x());
        // 1/0 is not folded
        assert!(matches!(
            Expr::div(Expr::num(1.0), Expr::num(0.0)),
            Expr::Div(..)
        ));
    }

    #[test]
    fn derivative_of_polynomial() {
        // d/dx (x^3 + 2x) = 3x^2 + 2
        let e = Expr::add(
            Expr::pow(x(), Expr::num(3.0)),
            Expr::mul(Expr::num(2.0), x()),
        );
        let d = e.diff("x");
        let at = BTreeMap::from([("x".to_string(), 2.0)]);
        assert_eq!(d.eval(&at).unwrap(), 14.0);
        assert_eq!(e.diff("y"), Expr::num(0.0));
    }

    #[test]
    fn derivative_of_functions() {
        let at = BTreeMap::from([("x".to_string(), 0.5)]);
        let cases = [
            (Func::Sin, 0.5f64.cos()),
            (Func::Cos, -(0.5f64.sin())),
            (Func::Exp, 0.5f64.exp()),
            (Func::Ln, 2.0),
            (Func::Sqrt, 0.5 / 0.5f64.sqrt()),
        ];
        for (f, expected) in cases {
            let d = Expr::call(f, x()).diff("x");
            assert!((d.eval(&at).unwrap() - expected).abs() < 1e-12, "{f:?}");
        }
    }

    #[test]
    fn eval_reports_free_symbols() {
        let e = Expr::add(x(), Expr::sym("y"));
        let at = BTreeMap::from([("x".to_string(), 1.0)]);
        assert_eq!(
            e.eval(&at),
            Err(SymbolicError::FreeSymbols {
                symbols: vec!["y".to_string()]
            })
        );
    }

    #[test]
    fn substitution_folds_constants() {
        let e = Expr::mul(Expr::sub(Expr::num(1.0), Expr::pow(x(), Expr::num(2.0))), Expr::sym("y"));
        let values = BTreeMap::from([("x".to_string(), 0.0)]);
        assert_eq!(e.substitute_values(&values), Expr::sym("y"));
        let exprs = BTreeMap::from([("y".to_string(), Expr::num(3.0))]);
        assert_eq!(
            e.substitute(&exprs).free_symbols(),
            BTreeSet::from(["x".to_string()])
        );
    }

    #[test]
    fn display_parenthesizes_by_precedence() {
        let e = Expr::mul(Expr::add(x(), Expr::num(1.0)), Expr::sym("y"));
        assert_eq!(e.to_string(), "(x + 1)*y");
        let p = Expr::pow(Expr::neg(x()), Expr::num(2.0));
        assert_eq!(p.to_string(), "(-x)^2");
        let s = Expr::sub(x(), Expr::sub(Expr::sym("y"), Expr::sym("z")));
        assert_eq!(s.to_string(), "x - (y - z)");
        assert_eq!(Expr::call(Func::Sin, x()).to_string(), "sin(x)");
    }

    #[test]
    fn negation_is_lifted_out_of_products() {
        let y = Expr::sym("y");
        let e = Expr::mul(Expr::neg(Expr::mul(Expr::num(2.0), x())), y.clone());
        assert_eq!(e, Expr::neg(Expr::mul(Expr::mul(Expr::num(2.0), x()), y.clone())));
        assert_eq!(Expr::mul(x(), Expr::neg(y.clone())), Expr::neg(Expr::mul(x(), y.clone())));
        assert_eq!(Expr::mul(Expr::neg(x()), Expr::neg(y.clone())), Expr::mul(x(), y.clone()));
        let sum = Expr::add(Expr::num(-1.0), e);
        assert_eq!(sum.to_string(), "-1 - 2*x*y");
    }
}
