//! Standard library of the bundled engine
//!
//! [`install`] defines the global functions and objects every runtime starts
//! with. Methods on primitives and arrays are not stored as properties; the
//! evaluator asks [`call_method`] when a receiver has no callable own
//! property of that name.
//!
//! String methods index by UTF-16 code units.

use crate::interpreter::engine::Runtime;
use crate::interpreter::errors::{ErrorKind, RuntimeError};
use crate::interpreter::host::{HostCall, HostFunctionSpec};
use crate::memory::object::{array_index, ObjectKind};
use crate::memory::value::{format_number, string_to_number, Value};

macro_rules! error_constructor {
    ($name:ident, $kind:expr) => {
        fn $name(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
            let message = match call.arg(0) {
                Value::Undefined => String::new(),
                other => other.to_display_string(),
            };
            Ok(call.runtime.make_error($kind, &message))
        }
    };
}

error_constructor!(error_ctor, ErrorKind::Error);
error_constructor!(type_error_ctor, ErrorKind::TypeError);
error_constructor!(reference_error_ctor, ErrorKind::ReferenceError);
error_constructor!(syntax_error_ctor, ErrorKind::SyntaxError);
error_constructor!(range_error_ctor, ErrorKind::RangeError);

const GLOBAL_FUNCTIONS: &[HostFunctionSpec] = &[
    HostFunctionSpec { name: "String", arity: 1, handler: string_ctor },
    HostFunctionSpec { name: "Number", arity: 1, handler: number_ctor },
    HostFunctionSpec { name: "Array", arity: 1, handler: array_ctor },
    HostFunctionSpec { name: "Error", arity: 1, handler: error_ctor },
    HostFunctionSpec { name: "TypeError", arity: 1, handler: type_error_ctor },
    HostFunctionSpec { name: "ReferenceError", arity: 1, handler: reference_error_ctor },
    HostFunctionSpec { name: "SyntaxError", arity: 1, handler: syntax_error_ctor },
    HostFunctionSpec { name: "RangeError", arity: 1, handler: range_error_ctor },
    HostFunctionSpec { name: "parseInt", arity: 2, handler: parse_int },
    HostFunctionSpec { name: "parseFloat", arity: 1, handler: parse_float },
    HostFunctionSpec { name: "isNaN", arity: 1, handler: is_nan },
];

const MATH_FUNCTIONS: &[HostFunctionSpec] = &[
    HostFunctionSpec { name: "floor", arity: 1, handler: math_floor },
    HostFunctionSpec { name: "ceil", arity: 1, handler: math_ceil },
    HostFunctionSpec { name: "abs", arity: 1, handler: math_abs },
    HostFunctionSpec { name: "round", arity: 1, handler: math_round },
    HostFunctionSpec { name: "sqrt", arity: 1, handler: math_sqrt },
    HostFunctionSpec { name: "pow", arity: 2, handler: math_pow },
    HostFunctionSpec { name: "max", arity: 2, handler: math_max },
    HostFunctionSpec { name: "min", arity: 2, handler: math_min },
];

/// Defines the standard globals on a fresh runtime.
pub fn install(runtime: &mut Runtime) {
    runtime.define_functions(GLOBAL_FUNCTIONS);
    runtime.define_global("NaN", Value::Number(f64::NAN));
    runtime.define_global("Infinity", Value::Number(f64::INFINITY));
    runtime.define_global("undefined", Value::Undefined);

    let from_char_code = runtime.new_native("fromCharCode", 1, string_from_char_code);
    if let Some(Value::Object(string)) = runtime.global("String") {
        string.borrow_mut().set("fromCharCode", from_char_code);
    }

    let math = runtime.new_object(ObjectKind::Plain);
    for spec in MATH_FUNCTIONS {
        let function = runtime.new_native(spec.name, spec.arity, spec.handler);
        math.borrow_mut().set(spec.name, function);
    }
    math.borrow_mut()
        .set("PI", Value::Number(std::f64::consts::PI));
    runtime.define_global("Math", Value::Object(math));
}

// ===== Global functions =====

fn string_ctor(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    if call.args.is_empty() {
        return Ok(Value::from(""));
    }
    Ok(Value::from(call.arg(0).to_display_string()))
}

fn number_ctor(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    if call.args.is_empty() {
        return Ok(Value::Number(0.0));
    }
    Ok(Value::Number(call.arg(0).to_number()))
}

fn array_ctor(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    if let [Value::Number(len)] = call.args {
        let len = *len;
        if len < 0.0 || len.fract() != 0.0 || len > u32::MAX as f64 {
            return Err(call.error(ErrorKind::RangeError, "invalid array length"));
        }
        return Ok(call
            .runtime
            .new_array(vec![Value::Undefined; len as usize]));
    }
    let elements = call.args.to_vec();
    Ok(call.runtime.new_array(elements))
}

fn string_from_char_code(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let units: Vec<u16> = call.args.iter().map(|v| v.to_uint32() as u16).collect();
    Ok(Value::from(String::from_utf16_lossy(&units)))
}

fn parse_int(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let text = call.arg(0).to_display_string();
    let radix = match call.arg(1) {
        Value::Undefined => 0,
        other => other.to_int32(),
    };
    Ok(Value::Number(parse_int_prefix(&text, radix)))
}

/// `parseInt`: leading digits of `text` in `radix` (0 picks 10 or 16).
fn parse_int_prefix(text: &str, radix: i32) -> f64 {
    let mut s = text.trim_start();
    let negative = s.starts_with('-');
    if negative || s.starts_with('+') {
        s = &s[1..];
    }

    let mut radix = radix;
    if radix != 0 && !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let has_hex_prefix = s.starts_with("0x") || s.starts_with("0X");
    if (radix == 0 || radix == 16) && has_hex_prefix {
        s = &s[2..];
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }

    let mut result = 0.0;
    let mut any = false;
    for c in s.chars() {
        let Some(digit) = c.to_digit(radix as u32) else {
            break;
        };
        result = result * radix as f64 + digit as f64;
        any = true;
    }
    match (any, negative) {
        (false, _) => f64::NAN,
        (true, true) => -result,
        (true, false) => result,
    }
}

fn parse_float(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let text = call.arg(0).to_display_string();
    Ok(Value::Number(parse_float_prefix(&text)))
}

/// `parseFloat`: the longest decimal literal at the start of `text`.
fn parse_float_prefix(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        return string_to_number(&s[..end + "Infinity".len()]);
    }

    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &s[digits_start..end] == "." {
        return f64::NAN;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse().unwrap_or(f64::NAN)
}

fn is_nan(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    Ok(Value::Bool(call.arg(0).to_number().is_nan()))
}

// ===== Math =====

fn math_unary(call: &HostCall<'_>, f: fn(f64) -> f64) -> Result<Value, RuntimeError> {
    Ok(Value::Number(f(call.arg(0).to_number())))
}

fn math_floor(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    math_unary(call, f64::floor)
}

fn math_ceil(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    math_unary(call, f64::ceil)
}

fn math_abs(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    math_unary(call, f64::abs)
}

fn math_sqrt(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    math_unary(call, f64::sqrt)
}

fn math_round(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    // Halves round towards +Infinity.
    math_unary(call, |n| (n + 0.5).floor())
}

fn math_pow(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let base = call.arg(0).to_number();
    let exponent = call.arg(1).to_number();
    Ok(Value::Number(base.powf(exponent)))
}

fn math_max(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let mut result = f64::NEG_INFINITY;
    for arg in call.args {
        let n = arg.to_number();
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        result = result.max(n);
    }
    Ok(Value::Number(result))
}

fn math_min(call: &mut HostCall<'_>) -> Result<Value, RuntimeError> {
    let mut result = f64::INFINITY;
    for arg in call.args {
        let n = arg.to_number();
        if n.is_nan() {
            return Ok(Value::Number(f64::NAN));
        }
        result = result.min(n);
    }
    Ok(Value::Number(result))
}

// ===== Methods =====

/// Calls built-in method `key` on `receiver`. `None` means there is no
/// such method.
pub(crate) fn call_method(
    rt: &mut Runtime,
    receiver: &Value,
    key: &str,
    args: &[Value],
) -> Option<Result<Value, RuntimeError>> {
    match receiver {
        Value::Str(s) => string_method(rt, s, key, args),
        Value::Number(n) => number_method(rt, *n, key, args),
        Value::Object(obj) => {
            let is_array = matches!(obj.borrow().kind, ObjectKind::Array(_));
            if is_array {
                if let Some(result) = array_method(rt, receiver, key, args) {
                    return Some(result);
                }
            }
            match key {
                "toString" => Some(Ok(Value::from(receiver.to_display_string()))),
                "hasOwnProperty" => {
                    let name = args.first().map(Value::to_display_string).unwrap_or_default();
                    Some(Ok(Value::Bool(obj.borrow().get(&name).is_some())))
                }
                _ => None,
            }
        }
        Value::Bool(_) if key == "toString" => Some(Ok(Value::from(receiver.to_display_string()))),
        _ => None,
    }
}

fn range_error(rt: &mut Runtime, message: &str) -> RuntimeError {
    RuntimeError::thrown(rt.make_error(ErrorKind::RangeError, message))
}

/// Relative index as taken by `slice`: negative counts from the end.
fn relative_index(value: Option<&Value>, len: usize, default: usize) -> usize {
    match value {
        None | Some(Value::Undefined) => default,
        Some(v) => {
            let n = v.to_number();
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            if n < 0.0 {
                (len as f64 + n).max(0.0) as usize
            } else {
                n.min(len as f64) as usize
            }
        }
    }
}

/// Index clamped into `0..=len`, as taken by `substring`.
fn clamped_index(value: Option<&Value>, len: usize, default: usize) -> usize {
    match value {
        None | Some(Value::Undefined) => default,
        Some(v) => {
            let n = v.to_number();
            if n.is_nan() {
                0
            } else {
                n.clamp(0.0, len as f64) as usize
            }
        }
    }
}

fn find_units(haystack: &[u16], needle: &[u16], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from.min(haystack.len()));
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| haystack[i..i + needle.len()] == *needle)
}

fn string_method(
    rt: &mut Runtime,
    s: &str,
    key: &str,
    args: &[Value],
) -> Option<Result<Value, RuntimeError>> {
    let units: Vec<u16> = s.encode_utf16().collect();
    let len = units.len();
    let from_units = |range: &[u16]| Value::from(String::from_utf16_lossy(range));

    let result = match key {
        "charAt" => {
            let i = args.first().map(|v| v.to_number()).unwrap_or(0.0);
            if i >= 0.0 && (i as usize) < len {
                let i = i as usize;
                from_units(&units[i..i + 1])
            } else {
                Value::from("")
            }
        }
        "charCodeAt" => {
            let i = args.first().map(|v| v.to_number()).unwrap_or(0.0);
            if i >= 0.0 && (i as usize) < len {
                Value::Number(units[i as usize] as f64)
            } else {
                Value::Number(f64::NAN)
            }
        }
        "indexOf" => {
            let needle: Vec<u16> = args
                .first()
                .map(Value::to_display_string)
                .unwrap_or_else(|| "undefined".to_string())
                .encode_utf16()
                .collect();
            let from = clamped_index(args.get(1), len, 0);
            let index = find_units(&units, &needle, from);
            Value::Number(index.map_or(-1.0, |i| i as f64))
        }
        "split" => {
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::Undefined) => vec![Value::from(s)],
                Some(sep) => {
                    let sep = sep.to_display_string();
                    if sep.is_empty() {
                        units.iter().map(|u| from_units(std::slice::from_ref(u))).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::from).collect()
                    }
                }
            };
            rt.new_array(parts)
        }
        "substring" => {
            let a = clamped_index(args.first(), len, 0);
            let b = clamped_index(args.get(1), len, len);
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            from_units(&units[start..end])
        }
        "slice" => {
            let start = relative_index(args.first(), len, 0);
            let end = relative_index(args.get(1), len, len);
            if start < end {
                from_units(&units[start..end])
            } else {
                Value::from("")
            }
        }
        "toUpperCase" => Value::from(s.to_uppercase()),
        "toLowerCase" => Value::from(s.to_lowercase()),
        "toString" => Value::from(s),
        _ => return None,
    };
    Some(Ok(result))
}

fn number_method(
    rt: &mut Runtime,
    n: f64,
    key: &str,
    args: &[Value],
) -> Option<Result<Value, RuntimeError>> {
    match key {
        "toString" => {
            let radix = match args.first() {
                None | Some(Value::Undefined) => 10,
                Some(v) => v.to_int32(),
            };
            if !(2..=36).contains(&radix) {
                return Some(Err(range_error(rt, "illegal radix")));
            }
            Some(Ok(Value::from(number_to_radix(n, radix as u32))))
        }
        "toFixed" => {
            let digits = args.first().map(|v| v.to_number()).unwrap_or(0.0);
            let digits = if digits.is_nan() { 0.0 } else { digits.trunc() };
            if !(0.0..=20.0).contains(&digits) {
                return Some(Err(range_error(rt, "precision out of range")));
            }
            if !n.is_finite() || n.abs() >= 1e21 {
                return Some(Ok(Value::from(format_number(n))));
            }
            Some(Ok(Value::from(format!("{:.*}", digits as usize, n))))
        }
        _ => None,
    }
}

/// `Number.prototype.toString(radix)`.
pub(crate) fn number_to_radix(n: f64, radix: u32) -> String {
    if radix == 10 || !n.is_finite() {
        return format_number(n);
    }
    let negative = n < 0.0;
    let n = n.abs();
    let mut integer = n.trunc();
    let mut fraction = n - integer;

    let mut digits = Vec::new();
    loop {
        let digit = (integer % radix as f64) as u32;
        digits.push(std::char::from_digit(digit, radix).unwrap_or('0'));
        integer = (integer / radix as f64).trunc();
        if integer < 1.0 {
            break;
        }
    }
    if negative {
        digits.push('-');
    }
    let mut out: String = digits.into_iter().rev().collect();

    if fraction > 0.0 {
        out.push('.');
        for _ in 0..52 {
            fraction *= radix as f64;
            let digit = fraction.trunc() as u32;
            out.push(std::char::from_digit(digit, radix).unwrap_or('0'));
            fraction -= digit as f64;
            if fraction <= 0.0 {
                break;
            }
        }
    }
    out
}

fn array_method(
    rt: &mut Runtime,
    receiver: &Value,
    key: &str,
    args: &[Value],
) -> Option<Result<Value, RuntimeError>> {
    let obj = receiver.as_object()?;
    let elements = match &obj.borrow().kind {
        ObjectKind::Array(elements) => elements.clone(),
        _ => return None,
    };
    let len = elements.len();

    let result = match key {
        "push" => {
            let mut o = obj.borrow_mut();
            if let ObjectKind::Array(elements) = &mut o.kind {
                elements.extend(args.iter().cloned());
                Value::Number(elements.len() as f64)
            } else {
                Value::Undefined
            }
        }
        "pop" => {
            let mut o = obj.borrow_mut();
            match &mut o.kind {
                ObjectKind::Array(elements) => elements.pop().unwrap_or_default(),
                _ => Value::Undefined,
            }
        }
        "join" => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(v) => v.to_display_string(),
            };
            let parts: Vec<String> = elements
                .iter()
                .map(|v| match v {
                    Value::Undefined | Value::Null => String::new(),
                    other => other.to_display_string(),
                })
                .collect();
            Value::from(parts.join(&sep))
        }
        "slice" => {
            let start = relative_index(args.first(), len, 0);
            let end = relative_index(args.get(1), len, len);
            let part = if start < end {
                elements[start..end].to_vec()
            } else {
                Vec::new()
            };
            rt.new_array(part)
        }
        "indexOf" => {
            let needle = args.first().cloned().unwrap_or_default();
            let from = relative_index(args.get(1), len, 0);
            let index = elements
                .iter()
                .skip(from)
                .position(|v| v.strict_equals(&needle))
                .map(|i| i + from);
            Value::Number(index.map_or(-1.0, |i| i as f64))
        }
        "concat" => {
            let mut joined = elements;
            for arg in args {
                let nested = arg.as_object().and_then(|o| match &o.borrow().kind {
                    ObjectKind::Array(items) => Some(items.clone()),
                    _ => None,
                });
                match nested {
                    Some(items) => joined.extend(items),
                    None => joined.push(arg.clone()),
                }
            }
            rt.new_array(joined)
        }
        _ => return None,
    };
    Some(Ok(result))
}

/// `length` and indexed characters of a string.
pub(crate) fn string_property(s: &str, key: &str) -> Value {
    if key == "length" {
        return Value::Number(s.encode_utf16().count() as f64);
    }
    match array_index(key) {
        Some(index) => s
            .encode_utf16()
            .nth(index)
            .map(|unit| Value::from(String::from_utf16_lossy(&[unit])))
            .unwrap_or_default(),
        None => Value::Undefined,
    }
}
