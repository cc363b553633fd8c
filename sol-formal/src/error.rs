#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use std::fmt;

use miette::Diagnostic;
use sol_ast::NodeId;
use thiserror::Error;

/// Which registry an entity lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Variable,
    Expression,
    GlobalSymbol,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EntityKind::Variable => "variable",
            EntityKind::Expression => "expression",
            EntityKind::GlobalSymbol => "global symbol",
        })
    }
}

/// Caller contract violations. None of these is recoverable inside the
/// encoder; the driver reports them as internal errors.
#[derive(Debug, Error, Diagnostic)]
pub enum EncodingError {
    #[error("{kind} `{entity}` is already registered")]
    #[diagnostic(code(sol::formal::already_registered))]
    AlreadyRegistered { kind: EntityKind, entity: String },

    #[error("{kind} `{entity}` was never registered")]
    #[diagnostic(
        code(sol::formal::not_registered),
        help("entities must be created before they are queried, reset or assigned")
    )]
    NotRegistered { kind: EntityKind, entity: String },

    #[error("no SSA indices were saved at node {node}")]
    #[diagnostic(code(sol::formal::no_saved_indices))]
    NoSavedIndices { node: NodeId },

    #[error("no intermediate context was saved at node {node}")]
    #[diagnostic(code(sol::formal::no_intermediate_context))]
    NoIntermediateContext { node: NodeId },
}

#[derive(Debug, Error, Diagnostic)]
pub enum SolverError {
    #[error("solver pop without a matching push")]
    #[diagnostic(code(sol::formal::solver_stack))]
    EmptyStack,
}

#[derive(Debug, Error, Diagnostic)]
#[error("invalid encoding settings: {message}")]
#[diagnostic(code(sol::formal::settings))]
pub struct SettingsError {
    pub message: String,
}
