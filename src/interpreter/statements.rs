//! Statement execution implementation
//!
//! Every statement returns a [`Completion`]: `return`, `break` and `continue`
//! travel outwards as values until a function call or loop consumes them.
//! Exceptions and aborts travel as `Err`.
//!
//! Blocks get their own scope for `let`/`const`; `var` names were hoisted to
//! the enclosing function (or the global scope) before the body started, so
//! a `var` initializer is just an assignment.

use crate::interpreter::engine::{Completion, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::memory::scope::Scope;
use crate::memory::value::Value;
use crate::parser::ast::*;

impl Interpreter<'_> {
    pub(crate) fn execute_statement(&mut self, stmt: &Stmt) -> Result<Completion, RuntimeError> {
        self.line = stmt.location().line;

        match stmt {
            Stmt::VarDecl {
                kind, declarations, ..
            } => {
                self.execute_var_decl(*kind, declarations)?;
                Ok(Completion::Normal)
            }
            // Bound when the enclosing body or block was entered.
            Stmt::FunctionDecl { .. } => Ok(Completion::Normal),
            Stmt::Expression { expr, .. } => {
                self.last_value = self.evaluate_expr(expr)?;
                Ok(Completion::Normal)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate_expr(condition)?.is_truthy() {
                    self.execute_statement(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute_statement(else_branch)
                } else {
                    Ok(Completion::Normal)
                }
            }
            Stmt::While {
                condition,
                body,
                location,
            } => self.execute_while(condition, body, *location),
            Stmt::DoWhile {
                body,
                condition,
                location,
            } => self.execute_do_while(body, condition, *location),
            Stmt::For {
                init,
                condition,
                update,
                body,
                location,
            } => self.execute_for(
                init.as_deref(),
                condition.as_ref(),
                update.as_ref(),
                body,
                *location,
            ),
            Stmt::Block { statements, .. } => self.execute_block(statements),
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate_expr(expr)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Stmt::Break { .. } => Ok(Completion::Break),
            Stmt::Continue { .. } => Ok(Completion::Continue),
            Stmt::Throw { value, .. } => Err(self.execute_throw(value)?),
            Stmt::Try {
                block,
                handler,
                finalizer,
                ..
            } => self.execute_try(block, handler.as_ref(), finalizer.as_deref()),
            Stmt::Empty { .. } => Ok(Completion::Normal),
        }
    }

    fn execute_var_decl(
        &mut self,
        kind: DeclKind,
        declarations: &[Declarator],
    ) -> Result<(), RuntimeError> {
        for decl in declarations {
            self.line = decl.location.line;
            match kind {
                DeclKind::Var => {
                    if let Some(init) = &decl.init {
                        let value = self.evaluate_expr(init)?;
                        self.assign_variable(&decl.name, value)?;
                    }
                }
                DeclKind::Let | DeclKind::Const => {
                    let value = match &decl.init {
                        Some(init) => self.evaluate_expr(init)?,
                        None => Value::Undefined,
                    };
                    self.declare_local(&decl.name, value, kind == DeclKind::Let);
                }
            }
        }
        Ok(())
    }

    /// Runs `statements` in a fresh block scope.
    pub(crate) fn execute_block(&mut self, statements: &[Stmt]) -> Result<Completion, RuntimeError> {
        let block = Scope::new_block(self.scope.clone());
        let saved = self.scope.replace(block);
        self.hoist_functions(statements);
        let result = self.execute_block_in_place(statements);
        self.scope = saved;
        result
    }

    /// Runs `statements` in the current scope, stopping at the first abrupt
    /// completion.
    pub(crate) fn execute_block_in_place(
        &mut self,
        statements: &[Stmt],
    ) -> Result<Completion, RuntimeError> {
        for stmt in statements {
            match self.execute_statement(stmt)? {
                Completion::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal)
    }
}
