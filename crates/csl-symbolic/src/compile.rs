//! Stack-machine compilation of expressions for repeated numeric evaluation.

use crate::error::{SymbolicError, SymbolicResult};
use crate::expr::{Expr, Func};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Op {
    Const(f64),
    /// Push the value of the state slot.
    Load(usize),
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Call(Func),
}

/// Postfix program evaluating one expression against an ordered state.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    ops: Vec<Op>,
    max_depth: usize,
}

impl Program {
    /// Compile `expr`, resolving symbols to their index in `symbols`.
    pub fn compile(expr: &Expr, symbols: &[String]) -> SymbolicResult<Self> {
        let mut ops = Vec::new();
        emit(expr, symbols, &mut ops)?;

        let mut depth = 0usize;
        let mut max_depth = 0usize;
        for op in &ops {
            match op {
                Op::Const(_) | Op::Load(_) => depth += 1,
                Op::Neg | Op::Call(_) => {}
                Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Pow => depth -= 1,
            }
            max_depth = max_depth.max(depth);
        }

        Ok(Self { ops, max_depth })
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Evaluate against `x`, reusing `stack` as scratch space.
    pub fn eval(&self, x: &[f64], stack: &mut Vec<f64>) -> f64 {
        stack.clear();
        stack.reserve(self.max_depth);
        for op in &self.ops {
            match *op {
                Op::Const(v) => stack.push(v),
                Op::Load(i) => stack.push(x.get(i).copied().unwrap_or(f64::NAN)),
                Op::Neg => {
                    if let Some(top) = stack.last_mut() {
                        *top = -*top;
                    }
                }
                Op::Call(f) => {
                    if let Some(top) = stack.last_mut() {
                        *top = f.apply(*top);
                    }
                }
                Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Pow => {
                    let rhs = stack.pop().unwrap_or(f64::NAN);
                    let lhs = stack.pop().unwrap_or(f64::NAN);
                    stack.push(match op {
                        Op::Add => lhs + rhs,
                        Op::Sub => lhs - rhs,
                        Op::Mul => lhs * rhs,
                        Op::Div => lhs / rhs,
                        _ => lhs.powf(rhs),
                    });
                }
            }
        }
        stack.pop().unwrap_or(f64::NAN)
    }
}

fn emit(expr: &Expr, symbols: &[String], ops: &mut Vec<Op>) -> SymbolicResult<()> {
    match expr {
        Expr::Num(v) => ops.push(Op::Const(*v)),
        Expr::Sym(name) => {
            let slot = symbols.iter().position(|s| s == name).ok_or_else(|| {
                SymbolicError::FreeSymbols {
                    symbols: vec![name.clone()],
                }
            })?;
            ops.push(Op::Load(slot));
        }
        Expr::Neg(a) => {
            emit(a, symbols, ops)?;
            ops.push(Op::Neg);
        }
        Expr::Call(f, a) => {
            emit(a, symbols, ops)?;
            ops.push(Op::Call(*f));
        }
        Expr::Add(a, b) => binary(a, b, Op::Add, symbols, ops)?,
        Expr::Sub(a, b) => binary(a, b, Op::Sub, symbols, ops)?,
        Expr::Mul(a, b) => binary(a, b, Op::Mul, symbols, ops)?,
        Expr::Div(a, b) => binary(a, b, Op::Div, symbols, ops)?,
        Expr::Pow(a, b) => binary(a, b, Op::Pow, symbols, ops)?,
    }
    Ok(())
}

fn binary(a: &Expr, b: &Expr, op: Op, symbols: &[String], ops: &mut Vec<Op>) -> SymbolicResult<()> {
    emit(a, symbols, ops)?;
    emit(b, symbols, ops)?;
    ops.push(op);
    Ok(())
}
