// Execution engine for the script language

use crate::interpreter::builtins;
use crate::interpreter::constants::{
    DEFAULT_STACK_CHUNK_SIZE, DEFAULT_VERSION, LET_CONST_VERSION, MAX_CALL_DEPTH,
    STACK_GROWS_DOWN,
};
use crate::interpreter::errors::{ErrorKind, RuntimeError};
use crate::interpreter::host::{Host, HostCall, HostFunctionSpec};
use crate::interpreter::report::DiagnosticReport;
use crate::memory::heap::{GcStats, Heap};
use crate::memory::object::{Callable, Closure, NativeFunction, Object, ObjectKind, ObjectRef};
use crate::memory::scope::{GlobalScope, Scope, ScopeRef};
use crate::memory::value::Value;
use crate::parser::ast::{FunctionDef, Program, Stmt};
use crate::parser::{self, ParseError, ParseOptions, ParseWarning};
use std::rc::Rc;

/// A compiled unit, ready to be executed once.
#[derive(Debug)]
pub struct Script {
    program: Rc<Program>,
    filename: Option<Rc<str>>,
}

impl Script {
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }
}

/// The engine instance: global scope, heap and execution options.
pub struct Runtime {
    pub(crate) globals: GlobalScope,
    pub(crate) heap: Heap,
    version: u32,
    strict: bool,
    stack_limit: Option<usize>,
    branch_callback: bool,
    pub(crate) call_depth: usize,
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl Runtime {
    /// Creates a runtime with the standard library installed.
    pub fn new() -> Self {
        let mut runtime = Runtime {
            globals: GlobalScope::default(),
            heap: Heap::new(DEFAULT_STACK_CHUNK_SIZE),
            version: DEFAULT_VERSION,
            strict: false,
            stack_limit: None,
            branch_callback: false,
            call_depth: 0,
        };
        builtins::install(&mut runtime);
        runtime
    }

    // ===== Options =====

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Sets the language version, returning the previous one.
    pub fn set_version(&mut self, version: u32) -> u32 {
        std::mem::replace(&mut self.version, version)
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Flips strict checking, returning the new state.
    pub fn toggle_strict(&mut self) -> bool {
        self.strict = !self.strict;
        self.strict
    }

    /// Freezes the current global bindings behind a fresh writable global.
    /// Returns `false` if the global was already sealed.
    pub fn seal_global(&mut self) -> bool {
        self.globals.seal()
    }

    pub fn stack_chunk_size(&self) -> usize {
        self.heap.chunk_size()
    }

    pub fn set_stack_chunk_size(&mut self, chunk_size: usize) {
        self.heap.set_chunk_size(chunk_size);
    }

    /// Native stack address beyond which a script call raises
    /// `too much recursion`. `None` disables the check.
    pub fn set_stack_limit(&mut self, limit: Option<usize>) {
        self.stack_limit = limit;
    }

    pub fn stack_limit(&self) -> Option<usize> {
        self.stack_limit
    }

    /// Enables [`Host::on_branch`] notifications on loop back-edges.
    pub fn set_branch_callback(&mut self, enabled: bool) {
        self.branch_callback = enabled;
    }

    pub(crate) fn branch_callback(&self) -> bool {
        self.branch_callback
    }

    pub fn parse_options(&self, start_line: usize) -> ParseOptions {
        ParseOptions {
            start_line,
            let_keywords: self.version == DEFAULT_VERSION || self.version >= LET_CONST_VERSION,
            strict: self.strict,
        }
    }

    // ===== Globals and objects =====

    /// Registers native functions on the global scope.
    pub fn define_functions(&mut self, specs: &[HostFunctionSpec]) {
        for spec in specs {
            let function = self.new_native(spec.name, spec.arity, spec.handler);
            self.globals.define(spec.name, function, true);
        }
    }

    pub fn define_global(&mut self, name: &str, value: Value) {
        self.globals.define(name, value, true);
    }

    pub fn global(&self, name: &str) -> Option<Value> {
        self.globals.get(name)
    }

    pub fn new_object(&mut self, kind: ObjectKind) -> ObjectRef {
        self.heap.allocate(Object::new(kind))
    }

    pub fn new_array(&mut self, elements: Vec<Value>) -> Value {
        Value::Object(self.new_object(ObjectKind::Array(elements)))
    }

    pub fn new_native(
        &mut self,
        name: &'static str,
        arity: u32,
        handler: crate::interpreter::host::HostFn,
    ) -> Value {
        Value::Object(self.new_object(ObjectKind::Function(Callable::Native(NativeFunction {
            name,
            arity,
            handler,
        }))))
    }

    /// Creates an error object such as `TypeError: message`.
    pub fn make_error(&mut self, kind: ErrorKind, message: &str) -> Value {
        let error = self.new_object(ObjectKind::Error);
        {
            let mut e = error.borrow_mut();
            e.set("name", Value::from(kind.name()));
            e.set("message", Value::from(message));
        }
        Value::Object(error)
    }

    // ===== Heap =====

    pub fn gc(&mut self) -> GcStats {
        self.heap.collect()
    }

    /// Collects if enough allocations accumulated since the last collection.
    pub fn maybe_gc(&mut self) -> Option<GcStats> {
        self.heap.maybe_collect()
    }

    // ===== Compilation =====

    /// `true` unless `source` fails to parse only because it ended early.
    pub fn is_compilable_unit(&self, source: &str) -> bool {
        parser::is_compilable_unit(source, self.parse_options(1))
    }

    fn parse_unit(
        &self,
        source: &str,
        filename: Option<&str>,
        start_line: usize,
    ) -> Result<(Script, Vec<ParseWarning>), ParseError> {
        let (program, warnings) = parser::parse_program(source, self.parse_options(start_line))?;
        let script = Script {
            program: Rc::new(program),
            filename: filename.map(Rc::from),
        };
        Ok((script, warnings))
    }

    fn report_warnings(
        host: &mut dyn Host,
        warnings: &[ParseWarning],
        source: &str,
        filename: Option<&str>,
    ) {
        for warning in warnings {
            host.report(
                &DiagnosticReport::warning(warning.message.clone(), warning.strict)
                    .at(filename, warning.location.line)
                    .with_source(source, warning.location.offset),
            );
        }
    }

    /// Compiles `source`, reporting warnings and any syntax error to `host`.
    pub fn compile(
        &mut self,
        source: &str,
        filename: Option<&str>,
        start_line: usize,
        host: &mut dyn Host,
    ) -> Result<Script, ParseError> {
        match self.parse_unit(source, filename, start_line) {
            Ok((script, warnings)) => {
                Self::report_warnings(host, &warnings, source, filename);
                Ok(script)
            }
            Err(err) => {
                host.report(
                    &DiagnosticReport::error(err.message.clone())
                        .at(filename, err.location.line)
                        .with_source(source, err.location.offset),
                );
                Err(err)
            }
        }
    }

    /// Compiles from inside a running script: a syntax error becomes a
    /// catchable `SyntaxError` instead of a report.
    pub fn compile_nested(
        &mut self,
        source: &str,
        filename: Option<&str>,
        start_line: usize,
        host: &mut dyn Host,
    ) -> Result<Script, RuntimeError> {
        match self.parse_unit(source, filename, start_line) {
            Ok((script, warnings)) => {
                Self::report_warnings(host, &warnings, source, filename);
                Ok(script)
            }
            Err(err) => {
                let value = self.make_error(ErrorKind::SyntaxError, &err.message);
                Err(RuntimeError::Thrown {
                    value,
                    filename: filename.map(Rc::from),
                    line: err.location.line,
                })
            }
        }
    }

    // ===== Execution =====

    /// Runs a compiled unit in the global scope. An uncaught exception is
    /// reported to `host` before it is returned.
    pub fn execute(&mut self, script: Script, host: &mut dyn Host) -> Result<Value, RuntimeError> {
        let result = self.execute_nested(script, host);
        if let Err(RuntimeError::Thrown {
            value,
            filename,
            line,
        }) = &result
        {
            host.report(&uncaught_report(value, filename.as_deref(), *line));
        }
        result
    }

    /// Runs a unit from inside a native function; exceptions propagate to
    /// the calling script.
    pub fn execute_nested(
        &mut self,
        script: Script,
        host: &mut dyn Host,
    ) -> Result<Value, RuntimeError> {
        tracing::trace!(file = script.filename(), "executing unit");
        let mut interp = Interpreter {
            rt: self,
            host,
            scope: None,
            filename: script.filename.clone(),
            line: 0,
            last_value: Value::Undefined,
        };
        interp.run_program(&script.program)
    }
}

/// `TypeError: msg` for error objects, `uncaught exception: v` otherwise.
fn uncaught_report(value: &Value, filename: Option<&str>, line: usize) -> DiagnosticReport {
    let is_error = value
        .as_object()
        .is_some_and(|obj| matches!(obj.borrow().kind, ObjectKind::Error));
    let message = if is_error {
        value.to_display_string()
    } else {
        format!("uncaught exception: {}", value.to_display_string())
    };
    DiagnosticReport::error(message).at(filename, line)
}

/// Outcome of executing a statement.
#[derive(Debug, Clone)]
pub(crate) enum Completion {
    Normal,
    Return(Value),
    Break,
    Continue,
}

/// Evaluation state for one execution: current scope and position.
pub(crate) struct Interpreter<'a> {
    pub(crate) rt: &'a mut Runtime,
    pub(crate) host: &'a mut dyn Host,
    /// Innermost local scope; `None` while running global code.
    pub(crate) scope: Option<ScopeRef>,
    pub(crate) filename: Option<Rc<str>>,
    pub(crate) line: usize,
    /// Value of the last expression statement, the unit's result.
    pub(crate) last_value: Value,
}

impl Interpreter<'_> {
    fn run_program(&mut self, program: &Program) -> Result<Value, RuntimeError> {
        for name in &program.var_names {
            self.rt.globals.declare_hoisted(name);
        }
        self.hoist_functions(&program.body);

        for stmt in &program.body {
            match self.execute_statement(stmt)? {
                Completion::Normal => {}
                // The parser rejects return/break/continue at top level.
                _ => break,
            }
        }
        Ok(std::mem::take(&mut self.last_value))
    }

    /// Binds every function declared directly in `body` before it runs.
    pub(crate) fn hoist_functions(&mut self, body: &[Stmt]) {
        for stmt in body {
            if let Stmt::FunctionDecl { function, .. } = stmt {
                self.bind_function(function);
            }
        }
    }

    pub(crate) fn bind_function(&mut self, function: &Rc<FunctionDef>) {
        let closure = self.make_closure(function);
        if let Some(name) = &function.name {
            self.declare_local(name, closure, true);
        }
    }

    pub(crate) fn make_closure(&mut self, function: &Rc<FunctionDef>) -> Value {
        let closure = Closure {
            def: function.clone(),
            scope: self.scope.clone(),
            filename: self.filename.clone(),
        };
        Value::Object(
            self.rt
                .new_object(ObjectKind::Function(Callable::Script(closure))),
        )
    }

    /// Declares in the innermost scope, or globally in global code.
    pub(crate) fn declare_local(&mut self, name: &str, value: Value, mutable: bool) {
        match &self.scope {
            Some(scope) => scope.borrow_mut().declare(name, value, mutable),
            None => self.rt.globals.define(name, value, mutable),
        }
    }

    /// Exception of `kind` at the current line.
    pub(crate) fn throw(&mut self, kind: ErrorKind, message: impl Into<String>) -> RuntimeError {
        let value = self.rt.make_error(kind, &message.into());
        RuntimeError::Thrown {
            value,
            filename: self.filename.clone(),
            line: self.line,
        }
    }

    /// Reports a strict-mode warning at the current line.
    pub(crate) fn strict_warning(&mut self, message: String) {
        if self.rt.is_strict() {
            let report = DiagnosticReport::warning(message, true)
                .at(self.filename.as_deref(), self.line);
            self.host.report(&report);
        }
    }

    // ===== Calls =====

    /// Calls `callee`; `description` names it in error messages.
    pub(crate) fn call_value(
        &mut self,
        callee: &Value,
        args: Vec<Value>,
        description: &str,
    ) -> Result<Value, RuntimeError> {
        enum Target {
            Script(Rc<FunctionDef>, Option<ScopeRef>, Option<Rc<str>>),
            Native(NativeFunction),
        }

        let target = {
            let obj = callee.as_object().map(|obj| obj.borrow());
            let kind = obj.as_deref().map(|o| &o.kind);
            let target = match kind {
                Some(ObjectKind::Function(Callable::Script(closure))) => Some(Target::Script(
                    closure.def.clone(),
                    closure.scope.clone(),
                    closure.filename.clone(),
                )),
                Some(ObjectKind::Function(Callable::Native(native))) => {
                    Some(Target::Native(*native))
                }
                _ => None,
            };
            target
        };
        let Some(target) = target else {
            return Err(self.not_a_function(description));
        };

        match target {
            Target::Script(def, scope, filename) => {
                self.call_script(callee, &def, scope, filename, args)
            }
            Target::Native(native) => {
                let line = self.line;
                let mut call = HostCall {
                    runtime: &mut *self.rt,
                    host: &mut *self.host,
                    args: &args,
                    filename: self.filename.clone(),
                    line,
                };
                (native.handler)(&mut call).map_err(|e| e.located(self.filename.as_ref(), line))
            }
        }
    }

    pub(crate) fn not_a_function(&mut self, description: &str) -> RuntimeError {
        self.throw(ErrorKind::TypeError, format!("{} is not a function", description))
    }

    fn call_script(
        &mut self,
        callee: &Value,
        def: &Rc<FunctionDef>,
        closure_scope: Option<ScopeRef>,
        filename: Option<Rc<str>>,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        self.enter_call()?;

        let scope = Scope::new_function(closure_scope);
        {
            let mut s = scope.borrow_mut();
            if let Some(name) = &def.name {
                s.declare(name, callee.clone(), true);
            }
            for (i, param) in def.params.iter().enumerate() {
                s.declare(param, args.get(i).cloned().unwrap_or_default(), true);
            }
            if !def.params.iter().any(|p| p == "arguments") {
                let arguments = self.rt.new_array(args);
                s.declare("arguments", arguments, true);
            }
            for name in &def.var_names {
                s.declare_hoisted(name);
            }
        }

        let saved_scope = self.scope.replace(scope);
        let saved_filename = std::mem::replace(&mut self.filename, filename);
        let saved_line = self.line;
        let saved_value = std::mem::take(&mut self.last_value);

        self.hoist_functions(&def.body);
        let result = self.execute_block_in_place(&def.body);

        self.scope = saved_scope;
        self.filename = saved_filename;
        self.line = saved_line;
        self.last_value = saved_value;
        self.rt.call_depth -= 1;

        match result? {
            Completion::Return(value) => Ok(value),
            _ => Ok(Value::Undefined),
        }
    }

    /// Checks call nesting and the native stack limit before a call.
    fn enter_call(&mut self) -> Result<(), RuntimeError> {
        let marker = 0u8;
        let here = std::hint::black_box(&marker) as *const u8 as usize;
        let past_limit = self.rt.stack_limit.is_some_and(|limit| {
            if STACK_GROWS_DOWN {
                here < limit
            } else {
                here > limit
            }
        });
        if past_limit || self.rt.call_depth >= MAX_CALL_DEPTH {
            return Err(self.throw(ErrorKind::InternalError, "too much recursion"));
        }
        self.rt.call_depth += 1;
        Ok(())
    }
}
