#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;

use super::{CheckResult, Expression, SolverInterface, Sort};
use crate::error::SolverError;

/// Receives a complete SMT-LIB2 query and returns the raw solver answer.
pub type QueryResponder = Box<dyn FnMut(&str) -> Option<String>>;

#[derive(Default)]
struct Frame {
    commands: Vec<String>,
    declared: HashMap<String, Sort>,
}

/// Records the encoding as an SMT-LIB2 script.
///
/// Queries go through an optional responder (an external solver process, a
/// canned answer in tests); without one every check is `Unknown`.
pub struct SmtLib2Interface {
    frames: Vec<Frame>,
    responder: Option<QueryResponder>,
}

impl SmtLib2Interface {
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
            responder: None,
        }
    }

    pub fn with_responder(responder: impl FnMut(&str) -> Option<String> + 'static) -> Self {
        Self {
            frames: vec![Frame::default()],
            responder: Some(Box::new(responder)),
        }
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declared_sort(name).is_some()
    }

    fn top(&mut self) -> &mut Frame {
        // `pop` never removes the bottom frame.
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }

    fn declared_sort(&self, name: &str) -> Option<&Sort> {
        self.frames.iter().rev().find_map(|f| f.declared.get(name))
    }

    /// All `(assert ...)` commands on the current stack, oldest first.
    pub fn assertions(&self) -> Vec<&str> {
        self.frames
            .iter()
            .flat_map(|f| f.commands.iter())
            .filter(|c| c.starts_with("(assert "))
            .map(String::as_str)
            .collect()
    }

    pub fn script(&self) -> String {
        let mut out = String::from("(set-option :produce-models true)\n(set-logic ALL)\n");
        for (depth, frame) in self.frames.iter().enumerate() {
            if depth > 0 {
                out.push_str("(push 1)\n");
            }
            for c in &frame.commands {
                out.push_str(c);
                out.push('\n');
            }
        }
        out
    }
}

impl Default for SmtLib2Interface {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SmtLib2Interface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtLib2Interface")
            .field("depth", &(self.frames.len() - 1))
            .field("assertions", &self.assertions().len())
            .field("responder", &self.responder.is_some())
            .finish()
    }
}

impl SolverInterface for SmtLib2Interface {
    fn reset(&mut self) {
        self.frames = vec![Frame::default()];
    }

    fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    fn pop(&mut self) -> Result<(), SolverError> {
        if self.frames.len() <= 1 {
            return Err(SolverError::EmptyStack);
        }
        self.frames.pop();
        Ok(())
    }

    fn declare_variable(&mut self, name: &str, sort: &Sort) {
        if let Some(existing) = self.declared_sort(name) {
            debug_assert_eq!(existing, sort, "`{name}` redeclared with a different sort");
            return;
        }
        tracing::trace!(name, sort = %sort.smtlib(), "declare");
        let frame = self.top();
        frame
            .commands
            .push(format!("(declare-fun |{name}| {})", sort.declaration()));
        frame.declared.insert(name.to_string(), sort.clone());
    }

    fn add_assertion(&mut self, expr: &Expression) {
        debug_assert_eq!(expr.sort(), &Sort::Bool);
        tracing::trace!(%expr, "assert");
        let frame = self.top();
        frame.commands.push(format!("(assert {expr})"));
    }

    fn check(&mut self, expressions: &[Expression]) -> (CheckResult, Vec<String>) {
        let mut query = self.script();
        query.push_str("(check-sat)\n");
        if !expressions.is_empty() {
            let values = expressions
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(" ");
            query.push_str(&format!("(get-value ({values}))\n"));
        }

        let Some(responder) = self.responder.as_mut() else {
            return (CheckResult::Unknown, Vec::new());
        };
        let Some(answer) = responder(&query) else {
            return (CheckResult::Error, Vec::new());
        };

        let mut lines = answer.lines().map(str::trim).filter(|l| !l.is_empty());
        let result = match lines.next() {
            Some("sat") => CheckResult::Satisfiable,
            Some("unsat") => CheckResult::Unsatisfiable,
            Some("unknown") => CheckResult::Unknown,
            _ => CheckResult::Error,
        };
        let values = if result == CheckResult::Satisfiable {
            lines.map(str::to_string).collect()
        } else {
            Vec::new()
        };
        (result, values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declarations_are_idempotent_and_scoped() {
        let mut s = SmtLib2Interface::new();
        s.declare_variable("x_0", &Sort::Int);
        s.declare_variable("x_0", &Sort::Int);
        assert_eq!(s.script().matches("declare-fun |x_0|").count(), 1);

        s.push();
        s.declare_variable("y_0", &Sort::Bool);
        assert!(s.is_declared("y_0"));
        s.pop().expect("pop");
        assert!(!s.is_declared("y_0"));
        assert!(s.is_declared("x_0"));
    }

    #[test]
    fn pop_without_push_is_an_error() {
        let mut s = SmtLib2Interface::new();
        assert!(matches!(s.pop(), Err(SolverError::EmptyStack)));
    }

    #[test]
    fn check_without_responder_is_unknown() {
        let mut s = SmtLib2Interface::new();
        s.add_assertion(&Expression::boolean(true));
        assert_eq!(s.check(&[]).0, CheckResult::Unknown);
    }

    #[test]
    fn check_forwards_the_script_to_the_responder() {
        let mut s = SmtLib2Interface::with_responder(|query| {
            assert!(query.contains("(assert (> x_0 3))"));
            assert!(query.contains("(get-value (x_0))"));
            Some("sat\n((x_0 4))\n".to_string())
        });
        let x = Expression::variable("x_0", Sort::Int);
        s.declare_variable("x_0", &Sort::Int);
        s.add_assertion(&x.clone().gt(Expression::int(3)));

        let (result, values) = s.check(&[x]);
        assert_eq!(result, CheckResult::Satisfiable);
        assert_eq!(values, vec!["((x_0 4))".to_string()]);
    }

    #[test]
    fn function_sorts_use_declare_fun_signature() {
        let mut s = SmtLib2Interface::new();
        s.declare_variable("f_0", &Sort::function(vec![Sort::Int, Sort::Int], Sort::Bool));
        assert!(s.script().contains("(declare-fun |f_0| (Int Int) Bool)"));
    }
}
