#![forbid(unsafe_code)]

//! Symbolic values of program entities.

mod ssa;

pub use ssa::SsaIndex;

use num_bigint::BigInt;
use num_traits::One;
use sol_ast::Type;

use crate::solver::{Expression, SolverInterface, Sort};

/// How a program type is represented in the solver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SymbolicKind {
    Bool,
    Integer { signed: bool, bits: u16 },
    Address,
    FixedBytes(u8),
    Enum { members: u32 },
    /// Uninterpreted function; every SSA version is a new function symbol.
    Function { domain: Vec<Sort>, codomain: Sort },
    /// Mappings and arrays.
    Array { key: Sort, value: Sort },
    /// Placeholder for types without a precise encoding: an unconstrained
    /// 256-bit unsigned integer.
    Abstract,
}

impl SymbolicKind {
    /// Precise representation of `ty`, `None` when the type is unsupported.
    pub fn of_type(ty: &Type) -> Option<Self> {
        match ty {
            Type::Bool => Some(SymbolicKind::Bool),
            Type::Integer { signed, bits } if is_valid_int_width(*bits) => {
                Some(SymbolicKind::Integer {
                    signed: *signed,
                    bits: *bits,
                })
            }
            Type::RationalNumber => Some(SymbolicKind::Integer {
                signed: true,
                bits: 256,
            }),
            Type::Address { .. } => Some(SymbolicKind::Address),
            Type::FixedBytes(n) if (1..=32).contains(n) => Some(SymbolicKind::FixedBytes(*n)),
            Type::Enum { members, .. } if *members > 0 => Some(SymbolicKind::Enum { members: *members }),
            Type::Mapping { key, value } => Some(SymbolicKind::Array {
                key: Self::of_type(key)?.sort(),
                value: Self::of_type(value)?.sort(),
            }),
            Type::Array { base, .. } => Some(SymbolicKind::Array {
                key: Sort::Int,
                value: Self::of_type(base)?.sort(),
            }),
            Type::Function { params, returns } => {
                let [ret] = returns.as_slice() else {
                    return None;
                };
                let domain = params
                    .iter()
                    .map(|p| Self::of_type(p).map(|k| k.sort()))
                    .collect::<Option<Vec<_>>>()?;
                Some(SymbolicKind::Function {
                    domain,
                    codomain: Self::of_type(ret)?.sort(),
                })
            }
            Type::Integer { .. }
            | Type::FixedBytes(_)
            | Type::Enum { .. }
            | Type::String
            | Type::Bytes
            | Type::Struct(_)
            | Type::Tuple(_)
            | Type::Contract(_)
            | Type::Magic(_) => None,
        }
    }

    pub fn sort(&self) -> Sort {
        match self {
            SymbolicKind::Bool => Sort::Bool,
            SymbolicKind::Integer { .. }
            | SymbolicKind::Address
            | SymbolicKind::FixedBytes(_)
            | SymbolicKind::Enum { .. }
            | SymbolicKind::Abstract => Sort::Int,
            SymbolicKind::Function { domain, codomain } => {
                Sort::function(domain.clone(), codomain.clone())
            }
            SymbolicKind::Array { key, value } => Sort::array(key.clone(), value.clone()),
        }
    }

    /// Inclusive value range of integer-like kinds.
    pub fn range(&self) -> Option<(BigInt, BigInt)> {
        match self {
            SymbolicKind::Integer { signed: false, bits } => Some(unsigned_range(u32::from(*bits))),
            SymbolicKind::Integer { signed: true, bits } => {
                let half = BigInt::one() << (u32::from(*bits) - 1);
                Some((-half.clone(), half - 1))
            }
            SymbolicKind::Address => Some(unsigned_range(160)),
            SymbolicKind::FixedBytes(n) => Some(unsigned_range(u32::from(*n) * 8)),
            SymbolicKind::Enum { members } => Some((BigInt::from(0), BigInt::from(*members - 1))),
            SymbolicKind::Abstract => Some(unsigned_range(256)),
            SymbolicKind::Bool | SymbolicKind::Function { .. } | SymbolicKind::Array { .. } => None,
        }
    }

    /// Default value of the kind; function symbols have none.
    pub fn zero(&self) -> Option<Expression> {
        zero_of_sort(&self.sort())
    }
}

/// `uint8` through `uint256` in steps of 8.
fn is_valid_int_width(bits: u16) -> bool {
    (8..=256).contains(&bits) && bits % 8 == 0
}

fn unsigned_range(bits: u32) -> (BigInt, BigInt) {
    (BigInt::from(0), (BigInt::one() << bits) - 1)
}

fn zero_of_sort(sort: &Sort) -> Option<Expression> {
    match sort {
        Sort::Bool => Some(Expression::boolean(false)),
        Sort::Int => Some(Expression::int(0)),
        Sort::Array { domain, range } => Some(Expression::const_array(
            domain.as_ref().clone(),
            zero_of_sort(range)?,
        )),
        Sort::Function { .. } => None,
    }
}

/// One program entity as seen by the solver: a sequence of SSA versions
/// named `<unique name>_<index>`.
#[derive(Clone, Debug)]
pub struct SymbolicVariable {
    ty: Type,
    kind: SymbolicKind,
    unique_name: String,
    ssa: SsaIndex,
}

impl SymbolicVariable {
    pub fn new(ty: Type, kind: SymbolicKind, unique_name: impl Into<String>) -> Self {
        Self {
            ty,
            kind,
            unique_name: unique_name.into(),
            ssa: SsaIndex::new(),
        }
    }

    pub fn ty(&self) -> &Type {
        &self.ty
    }

    pub fn kind(&self) -> &SymbolicKind {
        &self.kind
    }

    pub fn sort(&self) -> Sort {
        self.kind.sort()
    }

    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    pub fn is_abstract(&self) -> bool {
        self.kind == SymbolicKind::Abstract
    }

    pub fn index(&self) -> u32 {
        self.ssa.index()
    }

    pub fn ssa(&self) -> &SsaIndex {
        &self.ssa
    }

    pub fn name_at_index(&self, index: u32) -> String {
        format!("{}_{}", self.unique_name, index)
    }

    pub fn current_name(&self) -> String {
        self.name_at_index(self.index())
    }

    pub fn value_at_index(&self, index: u32) -> Expression {
        Expression::variable(self.name_at_index(index), self.sort())
    }

    pub fn current_value(&self) -> Expression {
        self.value_at_index(self.index())
    }

    /// Moves to a fresh SSA version, declares it and returns its value.
    pub fn increase_index(&mut self, solver: &mut dyn SolverInterface) -> Expression {
        self.ssa.increase();
        self.declare_current(solver);
        self.current_value()
    }

    /// Points the variable at an already issued version.
    pub fn set_index(&mut self, index: u32) {
        self.ssa.set(index);
    }

    pub fn declare_current(&self, solver: &mut dyn SolverInterface) {
        solver.declare_variable(&self.current_name(), &self.sort());
    }

    /// `lo <= value <= hi` for the current version of range-typed values.
    pub fn range_constraint(&self) -> Option<Expression> {
        let (lo, hi) = self.kind.range()?;
        let v = self.current_value();
        Some(Expression::int(lo).le(v.clone()).and(v.le(Expression::int(hi))))
    }
}

pub fn is_supported_type(ty: &Type) -> bool {
    SymbolicKind::of_type(ty).is_some()
}

/// Builds the symbolic representation of `ty` and declares its first version.
///
/// Returns `true` when the type is unsupported and the value was abstracted.
pub fn new_symbolic_variable(
    ty: &Type,
    unique_name: impl Into<String>,
    solver: &mut dyn SolverInterface,
) -> (bool, SymbolicVariable) {
    let (abstracted, kind) = match SymbolicKind::of_type(ty) {
        Some(kind) => (false, kind),
        None => (true, SymbolicKind::Abstract),
    };
    let var = SymbolicVariable::new(ty.clone(), kind, unique_name);
    var.declare_current(solver);
    (abstracted, var)
}

/// New version equal to the type's default. Function symbols are left
/// unconstrained.
pub fn set_zero_value(var: &mut SymbolicVariable, solver: &mut dyn SolverInterface) {
    let value = var.increase_index(solver);
    if let Some(zero) = var.kind().zero() {
        solver.add_assertion(&value.equals(zero));
    }
}

/// New unconstrained version, kept inside the type's range when
/// `range_constraints` is set.
pub fn set_unknown_value(
    var: &mut SymbolicVariable,
    solver: &mut dyn SolverInterface,
    range_constraints: bool,
) {
    var.increase_index(solver);
    if range_constraints {
        if let Some(c) = var.range_constraint() {
            solver.add_assertion(&c);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::SmtLib2Interface;

    #[test]
    fn classifies_supported_types() {
        assert_eq!(SymbolicKind::of_type(&Type::Bool), Some(SymbolicKind::Bool));
        assert_eq!(
            SymbolicKind::of_type(&Type::mapping(Type::address(), Type::uint(256))),
            Some(SymbolicKind::Array {
                key: Sort::Int,
                value: Sort::Int
            })
        );
        assert_eq!(
            SymbolicKind::of_type(&Type::mapping(
                Type::address(),
                Type::mapping(Type::address(), Type::Bool)
            ))
            .map(|k| k.sort()),
            Some(Sort::array(Sort::Int, Sort::array(Sort::Int, Sort::Bool)))
        );
        assert!(is_supported_type(&Type::FixedBytes(4)));
    }

    #[test]
    fn rejects_types_without_precise_encoding() {
        assert!(!is_supported_type(&Type::String));
        assert!(!is_supported_type(&Type::Struct("S".into())));
        assert!(!is_supported_type(&Type::mapping(Type::uint(8), Type::String)));
        assert!(!is_supported_type(&Type::Function {
            params: vec![],
            returns: vec![Type::Bool, Type::Bool],
        }));
        assert!(!is_supported_type(&Type::Enum {
            name: "Empty".into(),
            members: 0
        }));
    }

    #[test]
    fn malformed_widths_are_abstracted() {
        for bits in [0, 7, 12, 264, 512] {
            assert!(!is_supported_type(&Type::uint(bits)), "uint{bits}");
            assert!(!is_supported_type(&Type::int(bits)), "int{bits}");
        }
        assert!(is_supported_type(&Type::uint(8)));
        assert!(is_supported_type(&Type::int(256)));

        assert!(!is_supported_type(&Type::FixedBytes(0)));
        assert!(!is_supported_type(&Type::FixedBytes(33)));
        assert!(is_supported_type(&Type::FixedBytes(1)));
        assert!(is_supported_type(&Type::FixedBytes(32)));
    }

    #[test]
    fn zero_width_integer_gets_an_unknown_value_in_the_abstract_range() {
        let mut solver = SmtLib2Interface::new();
        let (abstracted, mut var) = new_symbolic_variable(&Type::int(0), "i_3", &mut solver);
        assert!(abstracted);
        set_unknown_value(&mut var, &mut solver, true);
        assert_eq!(var.index(), 1);
        assert_eq!(solver.assertions().len(), 1);
    }

    #[test]
    fn integer_ranges() {
        let (lo, hi) = SymbolicKind::Integer { signed: false, bits: 8 }.range().expect("range");
        assert_eq!((lo, hi), (BigInt::from(0), BigInt::from(255)));
        let (lo, hi) = SymbolicKind::Integer { signed: true, bits: 8 }.range().expect("range");
        assert_eq!((lo, hi), (BigInt::from(-128), BigInt::from(127)));
        let (_, hi) = SymbolicKind::Address.range().expect("range");
        assert_eq!(hi.bits(), 160);
        let (_, hi) = SymbolicKind::FixedBytes(2).range().expect("range");
        assert_eq!(hi, BigInt::from(65535));
    }

    #[test]
    fn factory_abstracts_unsupported_types() {
        let mut solver = SmtLib2Interface::new();
        let (abstracted, var) = new_symbolic_variable(&Type::String, "s_4", &mut solver);
        assert!(abstracted);
        assert!(var.is_abstract());
        assert_eq!(var.sort(), Sort::Int);
        assert!(solver.is_declared("s_4_0"));

        let (abstracted, var) = new_symbolic_variable(&Type::uint(256), "x_5", &mut solver);
        assert!(!abstracted);
        assert_eq!(var.current_name(), "x_5_0");
    }

    #[test]
    fn zero_value_of_mapping_is_constant_array() {
        let mut solver = SmtLib2Interface::new();
        let (_, mut var) =
            new_symbolic_variable(&Type::mapping(Type::address(), Type::Bool), "m_1", &mut solver);
        set_zero_value(&mut var, &mut solver);
        assert_eq!(var.index(), 1);
        assert_eq!(
            solver.assertions(),
            vec!["(assert (= m_1_1 ((as const (Array Int Bool)) false)))"]
        );
    }

    #[test]
    fn unknown_value_respects_range_setting() {
        let mut solver = SmtLib2Interface::new();
        let (_, mut var) = new_symbolic_variable(&Type::uint(8), "x_1", &mut solver);
        set_unknown_value(&mut var, &mut solver, false);
        assert!(solver.assertions().is_empty());
        set_unknown_value(&mut var, &mut solver, true);
        assert_eq!(var.index(), 2);
        assert_eq!(
            solver.assertions(),
            vec!["(assert (and (<= 0 x_1_2) (<= x_1_2 255)))"]
        );
    }

    #[test]
    fn function_values_are_applied_by_name() {
        let mut solver = SmtLib2Interface::new();
        let ty = Type::Function {
            params: vec![Type::uint(256)],
            returns: vec![Type::Bool],
        };
        let (abstracted, mut f) = new_symbolic_variable(&ty, "f_2", &mut solver);
        assert!(!abstracted);
        set_zero_value(&mut f, &mut solver);
        assert!(solver.assertions().is_empty());
        let call = Expression::apply(&f.current_value(), vec![Expression::int(1)]);
        assert_eq!(call.to_string(), "(f_2_1 1)");
    }
}
