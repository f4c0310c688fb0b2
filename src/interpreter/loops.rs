//! Loop statement execution (`while`, `do-while`, `for`).
//!
//! Adds `impl Interpreter` methods for the three loop forms. `break` and
//! `continue` are folded into [`LoopBodyResult`] so the loop driver can react
//! without inspecting completions itself.
//!
//! Every back-edge notifies the host while the branch callback is enabled;
//! the host may request a collection or abort the run.

use crate::interpreter::engine::{Completion, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::interpreter::host::{BranchAction, BranchSite};
use crate::memory::scope::Scope;
use crate::parser::ast::{DeclKind, Expr, SourceLocation, Stmt};

/// Result returned by [`Interpreter::execute_loop_body`] to signal how the body ended.
pub(crate) enum LoopBodyResult {
    /// Body completed normally or via `continue`; the loop should iterate again.
    Continue,
    /// `break` was encountered; the loop should exit cleanly.
    Break,
    /// `return` was executed; the completion propagates to the caller.
    Exit(Completion),
}

impl Interpreter<'_> {
    pub(crate) fn execute_loop_body(&mut self, body: &Stmt) -> Result<LoopBodyResult, RuntimeError> {
        Ok(match self.execute_statement(body)? {
            Completion::Normal | Completion::Continue => LoopBodyResult::Continue,
            Completion::Break => LoopBodyResult::Break,
            other => LoopBodyResult::Exit(other),
        })
    }

    /// Loop back-edge: lets the host count branches, collect or abort.
    pub(crate) fn branch(&mut self, location: SourceLocation) -> Result<(), RuntimeError> {
        if !self.rt.branch_callback() {
            return Ok(());
        }
        let site = BranchSite {
            filename: self.filename.as_deref(),
            line: location.line,
        };
        match self.host.on_branch(&site) {
            BranchAction::Continue => Ok(()),
            BranchAction::Collect => {
                self.rt.maybe_gc();
                Ok(())
            }
            BranchAction::Abort => Err(RuntimeError::Aborted),
        }
    }

    /// Executes a `while (condition) body` loop.
    pub(crate) fn execute_while(
        &mut self,
        condition: &Expr,
        body: &Stmt,
        location: SourceLocation,
    ) -> Result<Completion, RuntimeError> {
        loop {
            self.line = location.line;
            if !self.evaluate_expr(condition)?.is_truthy() {
                break;
            }

            match self.execute_loop_body(body)? {
                LoopBodyResult::Continue => {}
                LoopBodyResult::Break => break,
                LoopBodyResult::Exit(completion) => return Ok(completion),
            }
            self.branch(location)?;
        }
        Ok(Completion::Normal)
    }

    /// Executes a `do body while (condition)` loop; the body runs at least once.
    pub(crate) fn execute_do_while(
        &mut self,
        body: &Stmt,
        condition: &Expr,
        location: SourceLocation,
    ) -> Result<Completion, RuntimeError> {
        loop {
            match self.execute_loop_body(body)? {
                LoopBodyResult::Continue => {}
                LoopBodyResult::Break => break,
                LoopBodyResult::Exit(completion) => return Ok(completion),
            }

            self.line = location.line;
            if !self.evaluate_expr(condition)?.is_truthy() {
                break;
            }
            self.branch(location)?;
        }
        Ok(Completion::Normal)
    }

    /// Executes `for (init; condition; update) body`. A `let`/`const`
    /// initializer gets a scope spanning the whole loop.
    pub(crate) fn execute_for(
        &mut self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        location: SourceLocation,
    ) -> Result<Completion, RuntimeError> {
        let scoped = matches!(
            init,
            Some(Stmt::VarDecl {
                kind: DeclKind::Let | DeclKind::Const,
                ..
            })
        );
        let saved = if scoped {
            let loop_scope = Scope::new_block(self.scope.clone());
            Some(self.scope.replace(loop_scope))
        } else {
            None
        };

        let result = self.run_for(init, condition, update, body, location);

        if let Some(saved) = saved {
            self.scope = saved;
        }
        result
    }

    fn run_for(
        &mut self,
        init: Option<&Stmt>,
        condition: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        location: SourceLocation,
    ) -> Result<Completion, RuntimeError> {
        if let Some(init) = init {
            self.execute_statement(init)?;
        }

        loop {
            self.line = location.line;
            if let Some(condition) = condition {
                if !self.evaluate_expr(condition)?.is_truthy() {
                    break;
                }
            }

            match self.execute_loop_body(body)? {
                LoopBodyResult::Continue => {}
                LoopBodyResult::Break => break,
                LoopBodyResult::Exit(completion) => return Ok(completion),
            }

            if let Some(update) = update {
                self.line = location.line;
                self.evaluate_expr(update)?;
            }
            self.branch(location)?;
        }
        Ok(Completion::Normal)
    }
}
