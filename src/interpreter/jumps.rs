use crate::interpreter::engine::{Completion, Interpreter};
use crate::interpreter::errors::RuntimeError;
use crate::memory::scope::Scope;
use crate::parser::ast::{CatchClause, Expr, Stmt};

impl Interpreter<'_> {
    /// Evaluates the operand of `throw` and wraps it as an exception.
    pub(crate) fn execute_throw(&mut self, value: &Expr) -> Result<RuntimeError, RuntimeError> {
        let line = self.line;
        let value = self.evaluate_expr(value)?;
        Ok(RuntimeError::Thrown {
            value,
            filename: self.filename.clone(),
            line,
        })
    }

    /// `try`/`catch`/`finally`. An abort skips both handlers. A `finally`
    /// block that completes abruptly overrides the earlier outcome.
    pub(crate) fn execute_try(
        &mut self,
        block: &[Stmt],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Stmt]>,
    ) -> Result<Completion, RuntimeError> {
        let mut result = self.execute_block(block);

        if let (Err(RuntimeError::Thrown { value, .. }), Some(handler)) = (&result, handler) {
            let value = value.clone();
            result = self.execute_catch(handler, value);
        }

        let Some(finalizer) = finalizer else {
            return result;
        };
        if matches!(result, Err(RuntimeError::Aborted)) {
            return result;
        }

        match self.execute_block(finalizer)? {
            Completion::Normal => result,
            abrupt => Ok(abrupt),
        }
    }

    fn execute_catch(
        &mut self,
        handler: &CatchClause,
        exception: crate::memory::value::Value,
    ) -> Result<Completion, RuntimeError> {
        let catch_scope = Scope::new_block(self.scope.clone());
        catch_scope
            .borrow_mut()
            .declare(&handler.param, exception, true);
        let saved = self.scope.replace(catch_scope);
        let result = self.execute_block(&handler.body);
        self.scope = saved;
        result
    }
}
