// src/resolver/formula.rs

//! Boolean formula tree produced by the encoder
//!
//! Formulas are kept as an ordered tree rather than flattened clauses so the
//! encoder output can be rendered, compared and re-checked against a model.
//! Lowering to CNF for the solver lives in the `cnf` module.

use std::fmt;

/// Opaque SAT variable identifier, rendered as `x<n>`
///
/// Identifiers are minted densely from zero by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VarId(pub u32);

impl VarId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for VarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// Propositional formula over [`VarId`]s
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Formula {
    Var(VarId),
    Not(Box<Formula>),
    /// Conjunction; empty is true
    And(Vec<Formula>),
    /// Disjunction; empty is false
    Or(Vec<Formula>),
    Implies(Box<Formula>, Box<Formula>),
    /// Exactly one operand is true; empty is false
    ExactlyOne(Vec<Formula>),
}

impl Formula {
    pub fn var(id: VarId) -> Self {
        Formula::Var(id)
    }

    pub fn not(inner: Formula) -> Self {
        Formula::Not(Box::new(inner))
    }

    pub fn and(operands: Vec<Formula>) -> Self {
        Formula::And(operands)
    }

    pub fn or(operands: Vec<Formula>) -> Self {
        Formula::Or(operands)
    }

    pub fn implies(premise: Formula, conclusion: Formula) -> Self {
        Formula::Implies(Box::new(premise), Box::new(conclusion))
    }

    pub fn exactly_one(operands: Vec<Formula>) -> Self {
        Formula::ExactlyOne(operands)
    }

    /// Evaluate under `assignment`
    pub fn evaluate(&self, assignment: &impl Fn(VarId) -> bool) -> bool {
        match self {
            Formula::Var(id) => assignment(*id),
            Formula::Not(inner) => !inner.evaluate(assignment),
            Formula::And(operands) => operands.iter().all(|f| f.evaluate(assignment)),
            Formula::Or(operands) => operands.iter().any(|f| f.evaluate(assignment)),
            Formula::Implies(premise, conclusion) => {
                !premise.evaluate(assignment) || conclusion.evaluate(assignment)
            }
            Formula::ExactlyOne(operands) => {
                operands.iter().filter(|f| f.evaluate(assignment)).count() == 1
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, operands: &[Formula], sep: &str) -> fmt::Result {
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", operand)?;
    }
    Ok(())
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Formula::Var(id) => write!(f, "{}", id),
            Formula::Not(inner) => write!(f, "!{}", inner),
            Formula::And(operands) if operands.is_empty() => f.write_str("true"),
            Formula::Or(operands) if operands.is_empty() => f.write_str("false"),
            Formula::And(operands) => {
                f.write_str("(")?;
                write_joined(f, operands, " & ")?;
                f.write_str(")")
            }
            Formula::Or(operands) => {
                f.write_str("(")?;
                write_joined(f, operands, " | ")?;
                f.write_str(")")
            }
            Formula::Implies(premise, conclusion) => {
                write!(f, "({} -> {})", premise, conclusion)
            }
            Formula::ExactlyOne(operands) => {
                f.write_str("one(")?;
                write_joined(f, operands, ", ")?;
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x(n: u32) -> Formula {
        Formula::var(VarId(n))
    }

    #[test]
    fn test_display() {
        let f = Formula::implies(x(3), Formula::and(vec![x(3), x(4)]));
        assert_eq!(f.to_string(), "(x3 -> (x3 & x4))");

        let f = Formula::exactly_one(vec![x(5), x(9)]);
        assert_eq!(f.to_string(), "one(x5, x9)");

        let f = Formula::implies(x(1), Formula::not(Formula::or(vec![x(2), x(7)])));
        assert_eq!(f.to_string(), "(x1 -> !(x2 | x7))");

        assert_eq!(Formula::and(vec![]).to_string(), "true");
        assert_eq!(Formula::or(vec![]).to_string(), "false");
    }

    #[test]
    fn test_evaluate() {
        let assignment = |id: VarId| id.0 % 2 == 0;

        assert!(x(0).evaluate(&assignment));
        assert!(!x(1).evaluate(&assignment));
        assert!(Formula::implies(x(1), x(3)).evaluate(&assignment));
        assert!(!Formula::implies(x(0), x(1)).evaluate(&assignment));
        assert!(Formula::exactly_one(vec![x(0), x(1), x(3)]).evaluate(&assignment));
        assert!(!Formula::exactly_one(vec![x(0), x(2)]).evaluate(&assignment));
        assert!(!Formula::exactly_one(vec![]).evaluate(&assignment));
        assert!(Formula::and(vec![]).evaluate(&assignment));
        assert!(!Formula::or(vec![]).evaluate(&assignment));
    }
}
