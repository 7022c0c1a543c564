// src/resolver/cnf.rs

//! Lowering of [`Formula`] trees to CNF for varisat
//!
//! Top-level structure is clausified directly: implications with a literal
//! premise become guarded clauses and `ExactlyOne` becomes at-least-one plus
//! at-most-one. Only operands that cannot be expressed as literals get a
//! Tseitin variable.
//!
//! Encoder variables map onto varisat variables of the same index, so the
//! first `var_count` varisat variables are reserved before any auxiliary
//! variable is allocated.

use super::formula::{Formula, VarId};
use varisat::{CnfFormula, ExtendFormula, Lit, Var};

/// Operand count up to which at-most-one is encoded pairwise
const PAIRWISE_LIMIT: usize = 5;

/// Accumulates clauses for a set of formulas
pub struct CnfBuilder {
    cnf: CnfFormula,
    truth: Option<Lit>,
}

impl CnfBuilder {
    /// Reserve the encoder's `var_count` variables
    pub fn new(var_count: usize) -> Self {
        let mut cnf = CnfFormula::new();
        cnf.new_var_iter(var_count).for_each(drop);
        Self { cnf, truth: None }
    }

    /// The varisat literal standing for an encoder variable
    pub fn literal(id: VarId) -> Lit {
        Var::from_index(id.index()).positive()
    }

    /// Add `formula` as a hard constraint
    pub fn assert(&mut self, formula: &Formula) {
        self.clausify(formula, &[]);
    }

    pub fn clause_count(&self) -> usize {
        self.cnf.len()
    }

    pub fn finish(self) -> CnfFormula {
        self.cnf
    }

    /// Emit `guard ∨ formula` as clauses
    fn clausify(&mut self, formula: &Formula, guard: &[Lit]) {
        match formula {
            Formula::Var(id) => self.emit(guard, &[Self::literal(*id)]),
            Formula::And(operands) => {
                for operand in operands {
                    self.clausify(operand, guard);
                }
            }
            Formula::Or(operands) => {
                let mut lits = Vec::with_capacity(operands.len());
                self.disjuncts(operands, &mut lits);
                self.emit(guard, &lits);
            }
            Formula::Implies(premise, conclusion) => {
                let lit = self.tseitin(premise);
                let mut inner = guard.to_vec();
                inner.push(!lit);
                self.clausify(conclusion, &inner);
            }
            Formula::ExactlyOne(operands) => {
                let lits: Vec<Lit> = operands.iter().map(|f| self.tseitin(f)).collect();
                self.emit(guard, &lits);
                self.at_most_one(guard, &lits);
            }
            Formula::Not(inner) => self.clausify_negated(inner, guard),
        }
    }

    /// Emit `guard ∨ ¬formula` as clauses
    fn clausify_negated(&mut self, formula: &Formula, guard: &[Lit]) {
        match formula {
            Formula::Var(id) => self.emit(guard, &[!Self::literal(*id)]),
            Formula::Not(inner) => self.clausify(inner, guard),
            Formula::Or(operands) => {
                for operand in operands {
                    self.clausify_negated(operand, guard);
                }
            }
            Formula::And(operands) => {
                let lits: Vec<Lit> = operands.iter().map(|f| !self.tseitin(f)).collect();
                self.emit(guard, &lits);
            }
            Formula::Implies(premise, conclusion) => {
                self.clausify(premise, guard);
                self.clausify_negated(conclusion, guard);
            }
            Formula::ExactlyOne(_) => {
                let lit = self.tseitin(formula);
                self.emit(guard, &[!lit]);
            }
        }
    }

    /// Flatten nested disjunctions into `out`
    fn disjuncts(&mut self, operands: &[Formula], out: &mut Vec<Lit>) {
        for operand in operands {
            match operand {
                Formula::Or(inner) => self.disjuncts(inner, out),
                other => {
                    let lit = self.tseitin(other);
                    out.push(lit);
                }
            }
        }
    }

    /// A literal equivalent to `formula`, defining auxiliaries as needed
    fn tseitin(&mut self, formula: &Formula) -> Lit {
        if let Some(lit) = simple_literal(formula) {
            return lit;
        }

        match formula {
            Formula::Var(id) => Self::literal(*id),
            Formula::Not(inner) => !self.tseitin(inner),
            Formula::And(operands) => {
                if operands.is_empty() {
                    return self.truth();
                }
                let lits: Vec<Lit> = operands.iter().map(|f| self.tseitin(f)).collect();
                let t = self.cnf.new_var().positive();
                for &lit in &lits {
                    self.emit(&[], &[!t, lit]);
                }
                let mut back: Vec<Lit> = lits.iter().map(|&lit| !lit).collect();
                back.push(t);
                self.emit(&[], &back);
                t
            }
            Formula::Or(operands) => {
                if operands.is_empty() {
                    return !self.truth();
                }
                let lits: Vec<Lit> = operands.iter().map(|f| self.tseitin(f)).collect();
                let t = self.cnf.new_var().positive();
                for &lit in &lits {
                    self.emit(&[], &[t, !lit]);
                }
                let mut forward = lits;
                forward.push(!t);
                self.emit(&[], &forward);
                t
            }
            Formula::Implies(premise, conclusion) => {
                let desugared = Formula::or(vec![
                    Formula::not((**premise).clone()),
                    (**conclusion).clone(),
                ]);
                self.tseitin(&desugared)
            }
            Formula::ExactlyOne(operands) => {
                let mut parts = vec![Formula::or(operands.clone())];
                for (i, a) in operands.iter().enumerate() {
                    for b in &operands[i + 1..] {
                        parts.push(Formula::or(vec![
                            Formula::not(a.clone()),
                            Formula::not(b.clone()),
                        ]));
                    }
                }
                self.tseitin(&Formula::and(parts))
            }
        }
    }

    /// At most one of `lits` holds unless some guard literal does
    fn at_most_one(&mut self, guard: &[Lit], lits: &[Lit]) {
        if lits.len() <= PAIRWISE_LIMIT {
            for (i, &a) in lits.iter().enumerate() {
                for &b in &lits[i + 1..] {
                    self.emit(guard, &[!a, !b]);
                }
            }
            return;
        }

        // Binary encoding: a true operand forces the bit pattern of its index
        let len_bits = lits.len().ilog2() as usize + 1;
        let bits: Vec<Var> = self.cnf.new_var_iter(len_bits).collect();
        for (i, &lit) in lits.iter().enumerate() {
            for (j, &bit) in bits.iter().enumerate() {
                self.emit(guard, &[!lit, bit.lit((1 << j) & i > 0)]);
            }
        }
    }

    /// Literal fixed to true by a unit clause
    fn truth(&mut self) -> Lit {
        if let Some(lit) = self.truth {
            return lit;
        }
        let lit = self.cnf.new_var().positive();
        self.cnf.add_clause(&[lit]);
        self.truth = Some(lit);
        lit
    }

    fn emit(&mut self, guard: &[Lit], lits: &[Lit]) {
        let mut clause: Vec<Lit> = guard.iter().chain(lits).copied().collect();
        if clause.is_empty() {
            clause.push(!self.truth());
        }
        clause.sort_unstable();
        clause.dedup();
        if clause.windows(2).any(|pair| pair[0] == !pair[1]) {
            return;
        }
        self.cnf.add_clause(&clause);
    }
}

/// The literal for a variable or a negated variable
fn simple_literal(formula: &Formula) -> Option<Lit> {
    match formula {
        Formula::Var(id) => Some(CnfBuilder::literal(*id)),
        Formula::Not(inner) => simple_literal(inner).map(|lit| !lit),
        _ => None,
    }
}
