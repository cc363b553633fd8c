#![forbid(unsafe_code)]

use std::collections::HashMap;

use z3::{
    ast::{Array, Ast, Bool, Dynamic, Int},
    Config, Context, FuncDecl, Params, SatResult, Solver,
};

use super::{CheckResult, Expression, Op, SmtProfile, SolverInterface, Sort, Term};
use crate::error::SolverError;

/// In-process Z3 backend.
pub struct Z3Interface {
    ctx: &'static Context,
    solver: Solver<'static>,
    constants: HashMap<String, Dynamic<'static>>,
    functions: HashMap<String, FuncDecl<'static>>,
    depth: usize,
}

impl Z3Interface {
    pub fn new(profile: SmtProfile) -> Self {
        let mut cfg = Config::new();
        cfg.set_model_generation(true);
        // Leaked so the solver can live next to its context without a
        // self-referential struct.
        let ctx: &'static Context = Box::leak(Box::new(Context::new(&cfg)));
        let solver = Solver::new(ctx);
        let mut params = Params::new(ctx);
        params.set_u32("timeout", profile.timeout_ms());
        solver.set_params(&params);
        Self {
            ctx,
            solver,
            constants: HashMap::new(),
            functions: HashMap::new(),
            depth: 0,
        }
    }

    fn z3_sort(&self, sort: &Sort) -> z3::Sort<'static> {
        match sort {
            Sort::Bool => z3::Sort::bool(self.ctx),
            Sort::Int => z3::Sort::int(self.ctx),
            Sort::Array { domain, range } => {
                z3::Sort::array(self.ctx, &self.z3_sort(domain), &self.z3_sort(range))
            }
            Sort::Function { codomain, .. } => self.z3_sort(codomain),
        }
    }

    fn int(&self, e: &Expression) -> Int<'static> {
        self.translate(e)
            .as_int()
            .unwrap_or_else(|| panic!("expected an integer term, got {e}"))
    }

    fn bool(&self, e: &Expression) -> Bool<'static> {
        self.translate(e)
            .as_bool()
            .unwrap_or_else(|| panic!("expected a boolean term, got {e}"))
    }

    fn array(&self, e: &Expression) -> Array<'static> {
        self.translate(e)
            .as_array()
            .unwrap_or_else(|| panic!("expected an array term, got {e}"))
    }

    /// Translation of a term over declared symbols. Undeclared symbols are a
    /// bug in the encoder and abort loudly.
    fn translate(&self, e: &Expression) -> Dynamic<'static> {
        let ctx = self.ctx;
        match e.term() {
            Term::Bool(b) => Dynamic::from_ast(&Bool::from_bool(ctx, *b)),
            Term::Int(n) => Dynamic::from_ast(
                &Int::from_str(ctx, &n.to_string()).expect("decimal literal"),
            ),
            Term::Var(name) => self
                .constants
                .get(name)
                .cloned()
                .unwrap_or_else(|| panic!("`{name}` was never declared")),
            Term::Apply { function, args } => {
                let decl = self
                    .functions
                    .get(function)
                    .unwrap_or_else(|| panic!("function `{function}` was never declared"));
                let args = args.iter().map(|a| self.translate(a)).collect::<Vec<_>>();
                let refs = args.iter().map(|a| a as &dyn Ast<'static>).collect::<Vec<_>>();
                decl.apply(&refs)
            }
            Term::App { op, args } => match op {
                Op::Not => Dynamic::from_ast(&self.bool(&args[0]).not()),
                Op::And | Op::Or => {
                    let parts = args.iter().map(|a| self.bool(a)).collect::<Vec<_>>();
                    let refs = parts.iter().collect::<Vec<_>>();
                    if *op == Op::And {
                        Dynamic::from_ast(&Bool::and(ctx, &refs))
                    } else {
                        Dynamic::from_ast(&Bool::or(ctx, &refs))
                    }
                }
                Op::Implies => {
                    Dynamic::from_ast(&self.bool(&args[0]).implies(&self.bool(&args[1])))
                }
                Op::Ite => self
                    .bool(&args[0])
                    .ite(&self.translate(&args[1]), &self.translate(&args[2])),
                Op::Eq => Dynamic::from_ast(&self.translate(&args[0])._eq(&self.translate(&args[1]))),
                Op::Lt => Dynamic::from_ast(&self.int(&args[0]).lt(&self.int(&args[1]))),
                Op::Le => Dynamic::from_ast(&self.int(&args[0]).le(&self.int(&args[1]))),
                Op::Gt => Dynamic::from_ast(&self.int(&args[0]).gt(&self.int(&args[1]))),
                Op::Ge => Dynamic::from_ast(&self.int(&args[0]).ge(&self.int(&args[1]))),
                Op::Add => Dynamic::from_ast(&Int::add(ctx, &[&self.int(&args[0]), &self.int(&args[1])])),
                Op::Sub => Dynamic::from_ast(&Int::sub(ctx, &[&self.int(&args[0]), &self.int(&args[1])])),
                Op::Mul => Dynamic::from_ast(&Int::mul(ctx, &[&self.int(&args[0]), &self.int(&args[1])])),
                Op::Div => Dynamic::from_ast(&self.int(&args[0]).div(&self.int(&args[1]))),
                Op::Mod => Dynamic::from_ast(&self.int(&args[0]).modulo(&self.int(&args[1]))),
                Op::Neg => Dynamic::from_ast(&self.int(&args[0]).unary_minus()),
                Op::Select => self.array(&args[0]).select(&self.translate(&args[1])),
                Op::Store => Dynamic::from_ast(
                    &self
                        .array(&args[0])
                        .store(&self.translate(&args[1]), &self.translate(&args[2])),
                ),
                Op::ConstArray => {
                    let Sort::Array { domain, .. } = e.sort() else {
                        panic!("const array with non-array sort {:?}", e.sort());
                    };
                    Dynamic::from_ast(&Array::const_array(
                        ctx,
                        &self.z3_sort(domain),
                        &self.translate(&args[0]),
                    ))
                }
            },
        }
    }
}

impl SolverInterface for Z3Interface {
    fn reset(&mut self) {
        self.solver.reset();
        self.constants.clear();
        self.functions.clear();
        self.depth = 0;
    }

    fn push(&mut self) {
        self.solver.push();
        self.depth += 1;
    }

    fn pop(&mut self) -> Result<(), SolverError> {
        if self.depth == 0 {
            return Err(SolverError::EmptyStack);
        }
        self.solver.pop(1);
        self.depth -= 1;
        Ok(())
    }

    fn declare_variable(&mut self, name: &str, sort: &Sort) {
        match sort {
            Sort::Function { domain, codomain } => {
                if self.functions.contains_key(name) {
                    return;
                }
                let dom = domain.iter().map(|s| self.z3_sort(s)).collect::<Vec<_>>();
                let dom_refs = dom.iter().collect::<Vec<_>>();
                let decl = FuncDecl::new(self.ctx, name, &dom_refs, &self.z3_sort(codomain));
                self.functions.insert(name.to_string(), decl);
            }
            other => {
                if self.constants.contains_key(name) {
                    return;
                }
                let c = Dynamic::new_const(self.ctx, name, &self.z3_sort(other));
                self.constants.insert(name.to_string(), c);
            }
        }
    }

    fn add_assertion(&mut self, expr: &Expression) {
        let b = self.bool(expr);
        self.solver.assert(&b);
    }

    fn check(&mut self, expressions: &[Expression]) -> (CheckResult, Vec<String>) {
        match self.solver.check() {
            SatResult::Unsat => (CheckResult::Unsatisfiable, Vec::new()),
            SatResult::Unknown => (CheckResult::Unknown, Vec::new()),
            SatResult::Sat => {
                let Some(model) = self.solver.get_model() else {
                    return (CheckResult::Satisfiable, Vec::new());
                };
                let values = expressions
                    .iter()
                    .map(|e| {
                        model
                            .eval(&self.translate(e), true)
                            .map(|v| v.to_string())
                            .unwrap_or_else(|| "<unknown>".to_string())
                    })
                    .collect();
                (CheckResult::Satisfiable, values)
            }
        }
    }
}
