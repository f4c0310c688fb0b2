//! Expression evaluation
//!
//! Assignment targets are resolved once into a [`Reference`] so compound
//! assignment and `++`/`--` evaluate the object and key a single time.

use crate::interpreter::builtins;
use crate::interpreter::engine::Interpreter;
use crate::interpreter::errors::{ErrorKind, RuntimeError};
use crate::memory::object::ObjectKind;
use crate::memory::scope::{self, AssignOutcome};
use crate::memory::value::{format_number, Value};
use crate::parser::ast::*;

/// A resolved assignment target.
pub(crate) enum Reference {
    Variable(String),
    Property { base: Value, key: String },
}

/// Converts an index value to a property key (`1` → `"1"`).
pub(crate) fn property_key(value: &Value) -> String {
    match value {
        Value::Number(n) => format_number(*n),
        other => other.to_display_string(),
    }
}

/// Description of the object part of a member expression, for messages
/// such as `x.y has no properties`.
fn base_description(target: &Expr) -> String {
    match target {
        Expr::Member { object, .. } | Expr::Index { object, .. } => object.describe(),
        other => other.describe(),
    }
}

/// Converts objects to their string form; primitives pass through.
fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Object(_) => Value::from(value.to_display_string()),
        other => other.clone(),
    }
}

/// Applies a binary operator to two evaluated operands.
pub(crate) fn binary_op(op: BinOp, left: &Value, right: &Value) -> Value {
    match op {
        BinOp::Add => {
            let (l, r) = (to_primitive(left), to_primitive(right));
            if matches!(l, Value::Str(_)) || matches!(r, Value::Str(_)) {
                let mut s = l.to_display_string();
                s.push_str(&r.to_display_string());
                Value::from(s)
            } else {
                Value::Number(l.to_number() + r.to_number())
            }
        }
        BinOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinOp::Mod => Value::Number(left.to_number() % right.to_number()),
        BinOp::Eq => Value::Bool(left.loose_equals(right)),
        BinOp::Ne => Value::Bool(!left.loose_equals(right)),
        BinOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinOp::StrictNe => Value::Bool(!left.strict_equals(right)),
        BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => Value::Bool(compare(op, left, right)),
        BinOp::BitAnd => Value::Number((left.to_int32() & right.to_int32()) as f64),
        BinOp::BitOr => Value::Number((left.to_int32() | right.to_int32()) as f64),
        BinOp::BitXor => Value::Number((left.to_int32() ^ right.to_int32()) as f64),
        BinOp::BitShl => {
            Value::Number(left.to_int32().wrapping_shl(right.to_uint32() & 31) as f64)
        }
        BinOp::BitShr => Value::Number((left.to_int32() >> (right.to_uint32() & 31)) as f64),
        BinOp::BitUShr => Value::Number((left.to_uint32() >> (right.to_uint32() & 31)) as f64),
    }
}

fn compare(op: BinOp, left: &Value, right: &Value) -> bool {
    let (l, r) = (to_primitive(left), to_primitive(right));
    if let (Value::Str(a), Value::Str(b)) = (&l, &r) {
        return match op {
            BinOp::Lt => a < b,
            BinOp::Le => a <= b,
            BinOp::Gt => a > b,
            _ => a >= b,
        };
    }
    let (a, b) = (l.to_number(), r.to_number());
    match op {
        BinOp::Lt => a < b,
        BinOp::Le => a <= b,
        BinOp::Gt => a > b,
        _ => a >= b,
    }
}

impl Interpreter<'_> {
    pub(crate) fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number(n, _) => Ok(Value::Number(*n)),
            Expr::Str(s, _) => Ok(Value::Str(s.clone())),
            Expr::Bool(b, _) => Ok(Value::Bool(*b)),
            Expr::Null(_) => Ok(Value::Null),
            Expr::Ident(name, _) => self.lookup_variable(name),
            Expr::Array(elements, _) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.evaluate_expr(element)?);
                }
                Ok(self.rt.new_array(values))
            }
            Expr::Object(properties, _) => {
                let object = self.rt.new_object(ObjectKind::Plain);
                for (key, value) in properties {
                    let value = self.evaluate_expr(value)?;
                    object.borrow_mut().set(key, value);
                }
                Ok(Value::Object(object))
            }
            Expr::Function(function, _) => Ok(self.make_closure(function)),
            Expr::Unary { op, operand, .. } => self.evaluate_unary(*op, operand),
            Expr::Update {
                op, prefix, target, ..
            } => self.evaluate_update(*op, *prefix, target),
            Expr::Binary {
                op, left, right, ..
            } => {
                let left = self.evaluate_expr(left)?;
                let right = self.evaluate_expr(right)?;
                Ok(binary_op(*op, &left, &right))
            }
            Expr::Logical {
                op, left, right, ..
            } => {
                let left = self.evaluate_expr(left)?;
                match (op, left.is_truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.evaluate_expr(right),
                }
            }
            Expr::Assign {
                op, target, value, ..
            } => self.evaluate_assign(*op, target, value),
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                if self.evaluate_expr(condition)?.is_truthy() {
                    self.evaluate_expr(then_expr)
                } else {
                    self.evaluate_expr(else_expr)
                }
            }
            Expr::Member {
                object, property, ..
            } => {
                let base = self.evaluate_expr(object)?;
                self.get_property(&base, property, &object.describe())
            }
            Expr::Index { object, index, .. } => {
                let base = self.evaluate_expr(object)?;
                let key = property_key(&self.evaluate_expr(index)?);
                self.get_property(&base, &key, &object.describe())
            }
            Expr::Call {
                callee,
                args,
                location,
            } => self.evaluate_call(callee, args, *location),
            Expr::Sequence(exprs, _) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.evaluate_expr(expr)?;
                }
                Ok(last)
            }
        }
    }

    fn evaluate_unary(&mut self, op: UnOp, operand: &Expr) -> Result<Value, RuntimeError> {
        if let (UnOp::Typeof, Expr::Ident(name, _)) = (op, operand) {
            // typeof never throws for an undeclared name
            let value = self.try_lookup_variable(name).unwrap_or_default();
            return Ok(Value::from(value.type_of()));
        }

        let value = self.evaluate_expr(operand)?;
        Ok(match op {
            UnOp::Neg => Value::Number(-value.to_number()),
            UnOp::Plus => Value::Number(value.to_number()),
            UnOp::Not => Value::Bool(!value.is_truthy()),
            UnOp::BitNot => Value::Number(!value.to_int32() as f64),
            UnOp::Typeof => Value::from(value.type_of()),
            UnOp::Void => Value::Undefined,
        })
    }

    fn evaluate_update(
        &mut self,
        op: UpdateOp,
        prefix: bool,
        target: &Expr,
    ) -> Result<Value, RuntimeError> {
        let reference = self.resolve_reference(target)?;
        let old = self.get_reference(&reference, target)?.to_number();
        let new = match op {
            UpdateOp::Increment => old + 1.0,
            UpdateOp::Decrement => old - 1.0,
        };
        self.put_reference(reference, Value::Number(new), target)?;
        Ok(Value::Number(if prefix { new } else { old }))
    }

    fn evaluate_assign(
        &mut self,
        op: Option<BinOp>,
        target: &Expr,
        value: &Expr,
    ) -> Result<Value, RuntimeError> {
        let reference = self.resolve_reference(target)?;
        let value = match op {
            None => self.evaluate_expr(value)?,
            Some(op) => {
                let current = self.get_reference(&reference, target)?;
                let rhs = self.evaluate_expr(value)?;
                binary_op(op, &current, &rhs)
            }
        };
        self.put_reference(reference, value.clone(), target)?;
        Ok(value)
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        location: SourceLocation,
    ) -> Result<Value, RuntimeError> {
        let (receiver, key) = match callee {
            Expr::Member {
                object, property, ..
            } => (Some(self.evaluate_expr(object)?), property.clone()),
            Expr::Index { object, index, .. } => {
                let base = self.evaluate_expr(object)?;
                let key = property_key(&self.evaluate_expr(index)?);
                (Some(base), key)
            }
            _ => (None, String::new()),
        };
        let function = match receiver {
            Some(_) => None,
            None => Some(self.evaluate_expr(callee)?),
        };

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate_expr(arg)?);
        }
        self.line = location.line;

        match (receiver, function) {
            (Some(receiver), _) => self.call_method(&receiver, &key, values, callee),
            (None, Some(function)) => self.call_value(&function, values, &callee.describe()),
            (None, None) => Ok(Value::Undefined),
        }
    }

    /// `receiver.key(args)`: own callable properties first, then the
    /// built-in methods of the receiver's type.
    fn call_method(
        &mut self,
        receiver: &Value,
        key: &str,
        args: Vec<Value>,
        callee: &Expr,
    ) -> Result<Value, RuntimeError> {
        match receiver {
            Value::Undefined | Value::Null => {
                let message = format!("{} has no properties", base_description(callee));
                return Err(self.throw(ErrorKind::TypeError, message));
            }
            Value::Object(obj) => {
                let own = obj.borrow().get(key);
                if let Some(function) = own {
                    return self.call_value(&function, args, &callee.describe());
                }
            }
            _ => {}
        }

        match builtins::call_method(self.rt, receiver, key, &args) {
            Some(result) => result.map_err(|e| e.located(self.filename.as_ref(), self.line)),
            None => Err(self.not_a_function(&callee.describe())),
        }
    }

    // ===== Variables =====

    fn try_lookup_variable(&self, name: &str) -> Option<Value> {
        if let Some(scope) = &self.scope {
            if let Some(value) = scope::lookup(scope, name) {
                return Some(value);
            }
        }
        self.rt.globals.get(name)
    }

    pub(crate) fn lookup_variable(&mut self, name: &str) -> Result<Value, RuntimeError> {
        match self.try_lookup_variable(name) {
            Some(value) => Ok(value),
            None => Err(self.throw(ErrorKind::ReferenceError, format!("{} is not defined", name))),
        }
    }

    pub(crate) fn assign_variable(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        if let Some(scope) = &self.scope {
            match scope::assign(scope, name, value.clone()) {
                AssignOutcome::Assigned => return Ok(()),
                AssignOutcome::Constant => return Err(self.const_assignment(name)),
                _ => {}
            }
        }

        match self.rt.globals.assign(name, value.clone()) {
            AssignOutcome::Assigned => Ok(()),
            AssignOutcome::Constant => Err(self.const_assignment(name)),
            AssignOutcome::Sealed => {
                self.strict_warning(format!("{} is read-only", name));
                Ok(())
            }
            AssignOutcome::NotFound => {
                self.strict_warning(format!("assignment to undeclared variable {}", name));
                self.rt.globals.define(name, value, true);
                Ok(())
            }
        }
    }

    fn const_assignment(&mut self, name: &str) -> RuntimeError {
        self.throw(ErrorKind::TypeError, format!("invalid assignment to const {}", name))
    }

    // ===== Properties =====

    pub(crate) fn get_property(
        &mut self,
        base: &Value,
        key: &str,
        description: &str,
    ) -> Result<Value, RuntimeError> {
        match base {
            Value::Undefined | Value::Null => Err(self.throw(
                ErrorKind::TypeError,
                format!("{} has no properties", description),
            )),
            Value::Str(s) => Ok(builtins::string_property(s, key)),
            Value::Object(obj) => {
                let value = obj.borrow().get(key);
                match value {
                    Some(value) => Ok(value),
                    None => {
                        self.strict_warning(format!("reference to undefined property {}", key));
                        Ok(Value::Undefined)
                    }
                }
            }
            _ => Ok(Value::Undefined),
        }
    }

    fn put_property(
        &mut self,
        base: &Value,
        key: &str,
        value: Value,
        description: &str,
    ) -> Result<(), RuntimeError> {
        match base {
            Value::Undefined | Value::Null => Err(self.throw(
                ErrorKind::TypeError,
                format!("{} has no properties", description),
            )),
            Value::Object(obj) => {
                obj.borrow_mut().set(key, value);
                Ok(())
            }
            // Writes to primitives are dropped.
            _ => Ok(()),
        }
    }

    // ===== References =====

    fn resolve_reference(&mut self, target: &Expr) -> Result<Reference, RuntimeError> {
        match target {
            Expr::Ident(name, _) => Ok(Reference::Variable(name.clone())),
            Expr::Member {
                object, property, ..
            } => Ok(Reference::Property {
                base: self.evaluate_expr(object)?,
                key: property.clone(),
            }),
            Expr::Index { object, index, .. } => {
                let base = self.evaluate_expr(object)?;
                let key = property_key(&self.evaluate_expr(index)?);
                Ok(Reference::Property { base, key })
            }
            _ => Err(self.throw(
                ErrorKind::ReferenceError,
                "invalid assignment left-hand side",
            )),
        }
    }

    fn get_reference(&mut self, reference: &Reference, target: &Expr) -> Result<Value, RuntimeError> {
        match reference {
            Reference::Variable(name) => self.lookup_variable(name),
            Reference::Property { base, key } => {
                self.get_property(base, key, &base_description(target))
            }
        }
    }

    fn put_reference(
        &mut self,
        reference: Reference,
        value: Value,
        target: &Expr,
    ) -> Result<(), RuntimeError> {
        match reference {
            Reference::Variable(name) => self.assign_variable(&name, value),
            Reference::Property { base, key } => {
                self.put_property(&base, &key, value, &base_description(target))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addition_concatenates_strings() {
        let result = binary_op(BinOp::Add, &Value::from("a"), &Value::Number(1.0));
        assert_eq!(result.to_display_string(), "a1");
        let result = binary_op(BinOp::Add, &Value::Number(2.0), &Value::Number(2.0));
        assert_eq!(result.to_number(), 4.0);
    }

    #[test]
    fn test_shifts() {
        let result = binary_op(BinOp::BitUShr, &Value::Number(-1.0), &Value::Number(0.0));
        assert_eq!(result.to_number(), 4_294_967_295.0);
        let result = binary_op(BinOp::BitShr, &Value::Number(-16.0), &Value::Number(2.0));
        assert_eq!(result.to_number(), -4.0);
        let result = binary_op(BinOp::BitShl, &Value::Number(1.0), &Value::Number(33.0));
        assert_eq!(result.to_number(), 2.0);
    }

    #[test]
    fn test_string_comparison() {
        let result = binary_op(BinOp::Lt, &Value::from("abc"), &Value::from("abd"));
        assert!(result.is_truthy());
        let result = binary_op(BinOp::Lt, &Value::from("10"), &Value::Number(9.0));
        assert!(!result.is_truthy());
    }

    #[test]
    fn test_modulo_keeps_dividend_sign() {
        let result = binary_op(BinOp::Mod, &Value::Number(-7.0), &Value::Number(3.0));
        assert_eq!(result.to_number(), -1.0);
    }
}
