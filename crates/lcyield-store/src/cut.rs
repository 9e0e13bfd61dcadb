//! Cut expressions: conjunctions of simple comparisons.
//!
//! Supports `col OP literal` terms joined by `&&`, where
//! OP ∈ {==, !=, <, <=, >, >=}. Literals are numbers or `true`/`false`.
//! All comparisons are done in f64.

use std::fmt;

use crate::cell::ColumnRef;
use crate::error::{Error, Result};
use crate::store::EventStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    fn eval(&self, lhs: f64, rhs: f64) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Ne => lhs != rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Le => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Ge => lhs >= rhs,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub column: String,
    pub op: CmpOp,
    pub literal: f64,
}

/// A parsed cut. The empty cut accepts every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cut {
    pub terms: Vec<Term>,
}

fn parse_term(cut: &str, expr: &str) -> Result<Term> {
    // two-character operators first so "<=" is not read as "<"
    let ops = [
        ("==", CmpOp::Eq),
        ("!=", CmpOp::Ne),
        ("<=", CmpOp::Le),
        (">=", CmpOp::Ge),
        ("<", CmpOp::Lt),
        (">", CmpOp::Gt),
    ];
    let bad = |reason: String| Error::Cut {
        cut: cut.to_string(),
        reason,
    };

    for (sym, op) in ops {
        if let Some(pos) = expr.find(sym) {
            let column = expr[..pos].trim();
            let lit = expr[pos + sym.len()..].trim();
            if column.is_empty() {
                return Err(bad(format!("missing column in '{expr}'")));
            }
            let literal = match lit {
                "true" => 1.0,
                "false" => 0.0,
                _ => lit
                    .parse::<f64>()
                    .map_err(|_| bad(format!("cannot parse '{lit}' as a number")))?,
            };
            return Ok(Term {
                column: column.to_string(),
                op,
                literal,
            });
        }
    }
    Err(bad(format!("unparseable predicate '{expr}'")))
}

impl Cut {
    pub fn parse(cut: &str) -> Result<Self> {
        if cut.trim().is_empty() {
            return Ok(Cut::default());
        }
        let terms = cut
            .split("&&")
            .map(|t| parse_term(cut, t.trim()))
            .collect::<Result<Vec<_>>>()?;
        Ok(Cut { terms })
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Distinct column names the cut reads, in first-use order.
    pub fn columns(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for t in &self.terms {
            if !out.contains(&t.column.as_str()) {
                out.push(&t.column);
            }
        }
        out
    }

    /// Bind every term to its column cell. The columns must be active.
    pub fn bind(&self, store: &EventStore) -> Result<BoundCut> {
        let terms = self
            .terms
            .iter()
            .map(|t| Ok((store.value_ref(&t.column)?, t.op, t.literal)))
            .collect::<Result<Vec<_>>>()?;
        Ok(BoundCut { terms })
    }
}

impl fmt::Display for Cut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .terms
            .iter()
            .map(|t| format!("{} {} {}", t.column, t.op.symbol(), t.literal))
            .collect();
        f.write_str(&parts.join(" && "))
    }
}

/// A cut whose terms read directly from store cells.
#[derive(Debug, Clone)]
pub struct BoundCut {
    terms: Vec<(ColumnRef, CmpOp, f64)>,
}

impl BoundCut {
    pub fn eval(&self) -> bool {
        self.terms
            .iter()
            .all(|(cell, op, lit)| op.eval(cell.f64(), *lit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_conjunctions() {
        let cut = Cut::parse("x > 5 && Lambdab_BKGCAT < 60 && flag == true").unwrap();
        assert_eq!(cut.terms.len(), 3);
        assert_eq!(cut.terms[0].op, CmpOp::Gt);
        assert_eq!(cut.terms[1].column, "Lambdab_BKGCAT");
        assert_eq!(cut.terms[1].literal, 60.0);
        assert_eq!(cut.terms[2].literal, 1.0);
        assert_eq!(cut.columns(), vec!["x", "Lambdab_BKGCAT", "flag"]);
    }

    #[test]
    fn two_char_operators_win() {
        let cut = Cut::parse("a<=3&&b>=-1.5&&c!=0").unwrap();
        assert_eq!(cut.terms[0].op, CmpOp::Le);
        assert_eq!(cut.terms[1].op, CmpOp::Ge);
        assert_eq!(cut.terms[1].literal, -1.5);
        assert_eq!(cut.terms[2].op, CmpOp::Ne);
    }

    #[test]
    fn empty_cut_has_no_terms() {
        assert!(Cut::parse("  ").unwrap().is_empty());
    }

    #[test]
    fn malformed_cuts_are_rejected() {
        assert!(Cut::parse("x 5").is_err());
        assert!(Cut::parse("> 5").is_err());
        assert!(Cut::parse("x > five").is_err());
        assert!(Cut::parse("x > 5 &&").is_err());
    }
}
