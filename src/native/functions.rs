//! Script-facing bridge functions

use super::bridge::{self, NativeArg, NativeCallDescriptor, NATIVE_ARG_SLOTS};
use crate::interpreter::{ErrorKind, HostCall, HostFunctionSpec, RuntimeError};
use crate::memory::value::Value;

/// The bridge functions registered on the global scope.
pub const BRIDGE_FUNCTIONS: &[HostFunctionSpec] = &[
    HostFunctionSpec { name: "get_dlsym", arity: 0, handler: get_dlsym },
    HostFunctionSpec { name: "ffi_call", arity: 9, handler: ffi_call },
    HostFunctionSpec { name: "peek8", arity: 1, handler: peek8 },
    HostFunctionSpec { name: "poke8", arity: 2, handler: poke8 },
    HostFunctionSpec { name: "peek32", arity: 1, handler: peek32 },
    HostFunctionSpec { name: "poke32", arity: 2, handler: poke32 },
];

/// Interprets a script number as an address.
fn address(value: &Value) -> usize {
    let n = value.to_number();
    if n.is_finite() {
        n as i64 as usize
    } else {
        0
    }
}

fn marshal(value: &Value) -> NativeArg {
    match value {
        Value::Number(n) if n.is_finite() => NativeArg::Integer(*n as i64 as isize),
        Value::Number(_) => NativeArg::Integer(0),
        Value::Str(s) => NativeArg::text(s),
        _ => NativeArg::Absent,
    }
}

fn get_dlsym(_call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    Ok(Value::Number(bridge::resolve_symbol() as f64))
}

fn ffi_call(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let target = match call.arg(0) {
        Value::Number(n) => address(&Value::Number(n)),
        _ => {
            return Err(call.error(ErrorKind::TypeError, "ffi_call target is not a number"));
        }
    };

    let mut descriptor = NativeCallDescriptor::new(target);
    for (slot, value) in descriptor
        .args
        .iter_mut()
        .zip(call.args.iter().skip(1).take(NATIVE_ARG_SLOTS))
    {
        *slot = marshal(value);
    }

    tracing::trace!(address = target, "native call");
    let result = unsafe { descriptor.invoke() };
    Ok(Value::Number(result as f64))
}

fn peek8(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let byte = unsafe { bridge::read_byte(address(&call.arg(0))) };
    Ok(Value::Number(byte as f64))
}

fn poke8(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let value = call.arg(1).to_number();
    let value = if value.is_finite() { value as i64 } else { 0 };
    unsafe { bridge::write_byte(address(&call.arg(0)), value) };
    Ok(Value::Undefined)
}

fn peek32(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let word = unsafe { bridge::read_word(address(&call.arg(0))) };
    Ok(Value::Number(word as f64))
}

fn poke32(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let value = call.arg(1).to_int32();
    unsafe { bridge::write_word(address(&call.arg(0)), value) };
    Ok(Value::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marshal_slots() {
        assert_eq!(marshal(&Value::Number(7.9)), NativeArg::Integer(7));
        assert_eq!(marshal(&Value::Number(-1.0)), NativeArg::Integer(-1));
        assert_eq!(marshal(&Value::Null), NativeArg::Absent);
        assert!(matches!(marshal(&Value::from("puts")), NativeArg::Text(_)));
    }

    #[test]
    fn test_address_of_non_finite_is_zero() {
        assert_eq!(address(&Value::Number(f64::NAN)), 0);
        assert_eq!(address(&Value::Number(4096.0)), 4096);
    }
}
