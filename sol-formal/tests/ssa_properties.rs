use std::collections::HashSet;

use proptest::{
    prelude::{any, prop},
    prop_assert,
    test_runner::{Config, TestCaseError, TestRunner},
};
use sol_ast::{span, NodeIdGen, Type, VariableDeclaration};
use sol_formal::{shared, EncodingContext, SmtLib2Interface};

#[derive(Clone, Copy, Debug)]
enum Step {
    NewValue,
    Reset,
    Snapshot,
    ResumeSnapshot,
    RestoreIndices,
}

fn step(raw: u8) -> Step {
    match raw % 5 {
        0 => Step::NewValue,
        1 => Step::Reset,
        2 => Step::Snapshot,
        3 => Step::ResumeSnapshot,
        _ => Step::RestoreIndices,
    }
}

#[test]
fn fresh_versions_are_never_reissued() {
    let mut runner = TestRunner::new(Config {
        cases: 128,
        ..Config::default()
    });

    let strat = prop::collection::vec(any::<u8>(), 1..48);

    runner
        .run(&strat, |raw| {
            let mut ids = NodeIdGen::new();
            let x = VariableDeclaration::local(ids.next_id(), span(0, 1), "x", Type::uint(64));
            let node = ids.next_id();

            let mut ctx = EncodingContext::new(shared(SmtLib2Interface::new()));
            ctx.create_variable(&x)
                .map_err(|e| TestCaseError::fail(e.to_string()))?;
            let base = ctx.copy_variable_indices();
            let mut have_snapshot = false;

            let mut issued = HashSet::new();
            issued.insert(current_name(&ctx, &x)?);

            for s in raw.into_iter().map(step) {
                match s {
                    Step::NewValue => {
                        ctx.new_value(&x)
                            .map_err(|e| TestCaseError::fail(e.to_string()))?;
                    }
                    Step::Reset => {
                        ctx.reset_variable(&x)
                            .map_err(|e| TestCaseError::fail(e.to_string()))?;
                    }
                    Step::Snapshot => {
                        ctx.save_intermediate_context(node);
                        have_snapshot = true;
                        continue;
                    }
                    Step::ResumeSnapshot => {
                        if have_snapshot {
                            ctx = ctx
                                .intermediate_context(node)
                                .map_err(|e| TestCaseError::fail(e.to_string()))?;
                        }
                        continue;
                    }
                    Step::RestoreIndices => {
                        ctx.restore_variable_indices(&base);
                        continue;
                    }
                }
                let name = current_name(&ctx, &x)?;
                prop_assert!(issued.insert(name.clone()), "{name} was issued twice");
            }
            Ok(())
        })
        .map_err(|e| format!("{e}"))
        .expect("SSA property");
}

fn current_name(ctx: &EncodingContext, x: &VariableDeclaration) -> Result<String, TestCaseError> {
    ctx.variable(x)
        .map(|v| v.current_name())
        .map_err(|e| TestCaseError::fail(e.to_string()))
}
