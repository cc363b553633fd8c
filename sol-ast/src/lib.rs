#![forbid(unsafe_code)]

use miette::SourceSpan;

pub type Span = SourceSpan;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub node: T,
}

impl<T> Spanned<T> {
    pub fn new(span: Span, node: T) -> Self {
        Self { span, node }
    }
}

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub type Ident = Spanned<String>;

/// Stable handle of an AST node.
///
/// Identity is the handle itself: two nodes with equal contents but different
/// ids are different entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out fresh node ids while a program is being built.
#[derive(Clone, Debug, Default)]
pub struct NodeIdGen {
    next: u32,
}

impl NodeIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

/// Semantic type of a variable or expression, as decided by the type checker.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Type {
    Bool,
    Integer {
        signed: bool,
        bits: u16,
    },
    Address {
        payable: bool,
    },
    /// `bytesN`, 1 <= N <= 32.
    FixedBytes(u8),
    Enum {
        name: String,
        members: u32,
    },
    /// Compile-time rational constant (literal arithmetic).
    RationalNumber,
    String,
    /// Dynamically sized `bytes`.
    Bytes,
    Array {
        base: Box<Type>,
        length: Option<u64>,
    },
    Mapping {
        key: Box<Type>,
        value: Box<Type>,
    },
    Struct(String),
    Tuple(Vec<Type>),
    Function {
        params: Vec<Type>,
        returns: Vec<Type>,
    },
    Contract(String),
    /// Built-in namespaces such as `msg`, `block` or `tx`.
    Magic(String),
}

impl Type {
    pub fn uint(bits: u16) -> Self {
        Type::Integer {
            signed: false,
            bits,
        }
    }

    pub fn int(bits: u16) -> Self {
        Type::Integer { signed: true, bits }
    }

    pub fn address() -> Self {
        Type::Address { payable: false }
    }

    pub fn mapping(key: Type, value: Type) -> Self {
        Type::Mapping {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn dynamic_array(base: Type) -> Self {
        Type::Array {
            base: Box::new(base),
            length: None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Type::Bool => "bool".to_string(),
            Type::Integer { signed: true, bits } => format!("int{bits}"),
            Type::Integer { signed: false, bits } => format!("uint{bits}"),
            Type::Address { payable: true } => "address payable".to_string(),
            Type::Address { payable: false } => "address".to_string(),
            Type::FixedBytes(n) => format!("bytes{n}"),
            Type::Enum { name, .. } => format!("enum {name}"),
            Type::RationalNumber => "rational_const".to_string(),
            Type::String => "string".to_string(),
            Type::Bytes => "bytes".to_string(),
            Type::Array { base, length } => match length {
                Some(n) => format!("{}[{n}]", base.display()),
                None => format!("{}[]", base.display()),
            },
            Type::Mapping { key, value } => {
                format!("mapping({} => {})", key.display(), value.display())
            }
            Type::Struct(name) => format!("struct {name}"),
            Type::Tuple(items) => {
                let items_s = items
                    .iter()
                    .map(|t| t.display())
                    .collect::<Vec<_>>()
                    .join(",");
                format!("tuple({items_s})")
            }
            Type::Function { params, returns } => {
                let params_s = params
                    .iter()
                    .map(|t| t.display())
                    .collect::<Vec<_>>()
                    .join(",");
                if returns.is_empty() {
                    format!("function ({params_s})")
                } else {
                    let returns_s = returns
                        .iter()
                        .map(|t| t.display())
                        .collect::<Vec<_>>()
                        .join(",");
                    format!("function ({params_s}) returns ({returns_s})")
                }
            }
            Type::Contract(name) => format!("contract {name}"),
            Type::Magic(name) => name.clone(),
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display())
    }
}

/// A declared local or state variable.
#[derive(Clone, Debug, PartialEq)]
pub struct VariableDeclaration {
    pub id: NodeId,
    pub span: Span,
    pub name: Ident,
    pub ty: Type,
    pub is_state_variable: bool,
}

impl VariableDeclaration {
    pub fn local(id: NodeId, span: Span, name: impl Into<String>, ty: Type) -> Self {
        Self {
            id,
            span,
            name: Spanned::new(span, name.into()),
            ty,
            is_state_variable: false,
        }
    }

    pub fn state(id: NodeId, span: Span, name: impl Into<String>, ty: Type) -> Self {
        Self {
            is_state_variable: true,
            ..Self::local(id, span, name, ty)
        }
    }
}

/// An expression node annotated with its type.
///
/// The encoder only ever looks at the identity and the annotation; the
/// structure of the expression lives in the front end.
#[derive(Clone, Debug, PartialEq)]
pub struct Expression {
    pub id: NodeId,
    pub span: Span,
    pub ty: Type,
}

impl Expression {
    pub fn new(id: NodeId, span: Span, ty: Type) -> Self {
        Self { id, span, ty }
    }
}
