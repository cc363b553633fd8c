#![forbid(unsafe_code)]

use std::fmt;
use std::ops;
use std::rc::Rc;

use num_bigint::BigInt;
use num_traits::Signed;

/// Sort of a solver term.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Sort {
    Bool,
    Int,
    Array {
        domain: Box<Sort>,
        range: Box<Sort>,
    },
    /// Uninterpreted function symbol.
    Function {
        domain: Vec<Sort>,
        codomain: Box<Sort>,
    },
}

impl Sort {
    pub fn array(domain: Sort, range: Sort) -> Self {
        Sort::Array {
            domain: Box::new(domain),
            range: Box::new(range),
        }
    }

    pub fn function(domain: Vec<Sort>, codomain: Sort) -> Self {
        Sort::Function {
            domain,
            codomain: Box::new(codomain),
        }
    }

    /// SMT-LIB2 spelling. Function sorts have none of their own and print
    /// their codomain; use [`Sort::declaration`] for `declare-fun`.
    pub fn smtlib(&self) -> String {
        match self {
            Sort::Bool => "Bool".to_string(),
            Sort::Int => "Int".to_string(),
            Sort::Array { domain, range } => {
                format!("(Array {} {})", domain.smtlib(), range.smtlib())
            }
            Sort::Function { codomain, .. } => codomain.smtlib(),
        }
    }

    /// `(<domain sorts>) <codomain>` as written after the name in `declare-fun`.
    pub fn declaration(&self) -> String {
        match self {
            Sort::Function { domain, codomain } => {
                let dom = domain.iter().map(Sort::smtlib).collect::<Vec<_>>().join(" ");
                format!("({dom}) {}", codomain.smtlib())
            }
            other => format!("() {}", other.smtlib()),
        }
    }
}

/// Built-in operators of the term language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Not,
    And,
    Or,
    Implies,
    Ite,
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Neg,
    Select,
    Store,
    ConstArray,
}

impl Op {
    pub fn smtlib(self) -> &'static str {
        match self {
            Op::Not => "not",
            Op::And => "and",
            Op::Or => "or",
            Op::Implies => "=>",
            Op::Ite => "ite",
            Op::Eq => "=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Add => "+",
            Op::Sub | Op::Neg => "-",
            Op::Mul => "*",
            Op::Div => "div",
            Op::Mod => "mod",
            Op::Select => "select",
            Op::Store => "store",
            Op::ConstArray => "const",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Term {
    Bool(bool),
    Int(BigInt),
    /// A declared constant (or function symbol, when its sort is a function).
    Var(String),
    App { op: Op, args: Vec<Expression> },
    /// Application of an uninterpreted function symbol.
    Apply { function: String, args: Vec<Expression> },
}

/// An immutable, cheaply cloneable solver term.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Expression {
    term: Rc<Term>,
    sort: Sort,
}

impl Expression {
    fn app(op: Op, args: Vec<Expression>, sort: Sort) -> Self {
        Self {
            term: Rc::new(Term::App { op, args }),
            sort,
        }
    }

    pub fn boolean(value: bool) -> Self {
        Self {
            term: Rc::new(Term::Bool(value)),
            sort: Sort::Bool,
        }
    }

    pub fn int(value: impl Into<BigInt>) -> Self {
        Self {
            term: Rc::new(Term::Int(value.into())),
            sort: Sort::Int,
        }
    }

    pub fn variable(name: impl Into<String>, sort: Sort) -> Self {
        Self {
            term: Rc::new(Term::Var(name.into())),
            sort,
        }
    }

    pub fn term(&self) -> &Term {
        &self.term
    }

    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Name of a constant, `None` for compound terms and literals.
    pub fn var_name(&self) -> Option<&str> {
        match self.term.as_ref() {
            Term::Var(name) => Some(name),
            _ => None,
        }
    }

    pub fn ite(condition: Expression, then_value: Expression, else_value: Expression) -> Self {
        debug_assert_eq!(condition.sort, Sort::Bool);
        let sort = then_value.sort.clone();
        Self::app(Op::Ite, vec![condition, then_value, else_value], sort)
    }

    pub fn implies(self, consequent: Expression) -> Self {
        Self::app(Op::Implies, vec![self, consequent], Sort::Bool)
    }

    pub fn and(self, other: Expression) -> Self {
        Self::app(Op::And, vec![self, other], Sort::Bool)
    }

    pub fn or(self, other: Expression) -> Self {
        Self::app(Op::Or, vec![self, other], Sort::Bool)
    }

    pub fn equals(self, other: Expression) -> Self {
        Self::app(Op::Eq, vec![self, other], Sort::Bool)
    }

    pub fn distinct(self, other: Expression) -> Self {
        !self.equals(other)
    }

    pub fn lt(self, other: Expression) -> Self {
        Self::app(Op::Lt, vec![self, other], Sort::Bool)
    }

    pub fn le(self, other: Expression) -> Self {
        Self::app(Op::Le, vec![self, other], Sort::Bool)
    }

    pub fn gt(self, other: Expression) -> Self {
        Self::app(Op::Gt, vec![self, other], Sort::Bool)
    }

    pub fn ge(self, other: Expression) -> Self {
        Self::app(Op::Ge, vec![self, other], Sort::Bool)
    }

    pub fn select(array: Expression, index: Expression) -> Self {
        let sort = match &array.sort {
            Sort::Array { range, .. } => range.as_ref().clone(),
            other => {
                debug_assert!(false, "select on non-array sort {other:?}");
                Sort::Int
            }
        };
        Self::app(Op::Select, vec![array, index], sort)
    }

    pub fn store(array: Expression, index: Expression, value: Expression) -> Self {
        let sort = array.sort.clone();
        Self::app(Op::Store, vec![array, index, value], sort)
    }

    /// Array of sort `(Array domain <sort of value>)` mapping every index to `value`.
    pub fn const_array(domain: Sort, value: Expression) -> Self {
        let sort = Sort::array(domain, value.sort.clone());
        Self::app(Op::ConstArray, vec![value], sort)
    }

    pub fn apply(function: &Expression, args: Vec<Expression>) -> Self {
        let (name, codomain) = match (function.term.as_ref(), &function.sort) {
            (Term::Var(name), Sort::Function { codomain, .. }) => {
                (name.clone(), codomain.as_ref().clone())
            }
            _ => {
                debug_assert!(false, "apply on non-function term {function}");
                (function.to_string(), Sort::Int)
            }
        };
        Self {
            term: Rc::new(Term::Apply {
                function: name,
                args,
            }),
            sort: codomain,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.term.as_ref() {
            Term::Bool(b) => write!(f, "{b}"),
            Term::Int(n) if n.is_negative() => write!(f, "(- {})", n.abs()),
            Term::Int(n) => write!(f, "{n}"),
            Term::Var(name) => f.write_str(name),
            Term::App {
                op: Op::ConstArray,
                args,
            } => write!(f, "((as const {}) {})", self.sort.smtlib(), args[0]),
            Term::App { op, args } => {
                write!(f, "({}", op.smtlib())?;
                for a in args {
                    write!(f, " {a}")?;
                }
                f.write_str(")")
            }
            Term::Apply { function, args } => {
                if args.is_empty() {
                    return f.write_str(function);
                }
                write!(f, "({function}")?;
                for a in args {
                    write!(f, " {a}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl ops::Not for Expression {
    type Output = Expression;

    fn not(self) -> Expression {
        Expression::app(Op::Not, vec![self], Sort::Bool)
    }
}

impl ops::Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        Expression::app(Op::Neg, vec![self], Sort::Int)
    }
}

macro_rules! arith_op {
    ($trait:ident, $method:ident, $op:expr) => {
        impl ops::$trait for Expression {
            type Output = Expression;

            fn $method(self, rhs: Expression) -> Expression {
                Expression::app($op, vec![self, rhs], Sort::Int)
            }
        }
    };
}

arith_op!(Add, add, Op::Add);
arith_op!(Sub, sub, Op::Sub);
arith_op!(Mul, mul, Op::Mul);
arith_op!(Div, div, Op::Div);
arith_op!(Rem, rem, Op::Mod);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_smtlib2() {
        let x = Expression::variable("x_1_0", Sort::Int);
        let e = (x.clone() + Expression::int(1)).le(Expression::int(-5));
        assert_eq!(e.to_string(), "(<= (+ x_1_0 1) (- 5))");
        assert_eq!(x.clone().distinct(Expression::int(0)).to_string(), "(not (= x_1_0 0))");
    }

    #[test]
    fn array_terms_carry_their_sorts() {
        let a = Expression::variable("balances_0", Sort::array(Sort::Int, Sort::Int));
        let read = Expression::select(a.clone(), Expression::int(7));
        assert_eq!(read.sort(), &Sort::Int);

        let write = Expression::store(a, Expression::int(7), read.clone() + Expression::int(1));
        assert_eq!(write.sort(), &Sort::array(Sort::Int, Sort::Int));
        assert_eq!(
            write.to_string(),
            "(store balances_0 7 (+ (select balances_0 7) 1))"
        );

        let zero = Expression::const_array(Sort::Int, Expression::boolean(false));
        assert_eq!(zero.to_string(), "((as const (Array Int Bool)) false)");
    }

    #[test]
    fn function_application_uses_codomain() {
        let f = Expression::variable("f_3_0", Sort::function(vec![Sort::Int], Sort::Bool));
        let call = Expression::apply(&f, vec![Expression::int(2)]);
        assert_eq!(call.sort(), &Sort::Bool);
        assert_eq!(call.to_string(), "(f_3_0 2)");
        assert_eq!(f.sort().declaration(), "(Int) Bool");
    }

    #[test]
    fn structural_equality() {
        let a = Expression::variable("a_0", Sort::Int);
        assert_eq!(a.clone() + Expression::int(1), a.clone() + Expression::int(1));
        assert_ne!(a.clone() + Expression::int(1), a - Expression::int(1));
    }
}
