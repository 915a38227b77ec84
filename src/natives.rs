//! Built‑in functions and the host I/O they are allowed to touch.
//!
//! The registry is a plain list handed to both the interpreter (which binds
//! each entry in its globals) and the resolver (which seeds its global
//! scope with the names). Only `clock` and `input` reach the host, and they
//! do so through [`IoProvider`] so tests can substitute a fixed clock and
//! scripted input.

use std::fmt;
use std::io::{self, BufRead};

use chrono::Utc;
use log::debug;

use crate::value::Value;

/// Host services available to natives.
pub trait IoProvider {
    /// Seconds since the Unix epoch.
    fn clock(&mut self) -> f64;

    /// One line of input without its line terminator; `None` at end of input.
    fn read_line(&mut self) -> Option<String>;
}

/// The real clock and standard input.
#[derive(Debug, Default)]
pub struct SystemIo;

impl IoProvider for SystemIo {
    fn clock(&mut self) -> f64 {
        Utc::now().timestamp_micros() as f64 / 1_000_000.0
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();

        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let trimmed = line.trim_end_matches(['\n', '\r']).len();
                line.truncate(trimmed);

                Some(line)
            }
        }
    }
}

/// Native implementation. An `Err` becomes a runtime error at the call site.
pub type NativeFn = fn(&mut dyn IoProvider, &[Value]) -> Result<Value, String>;

pub struct NativeFunction {
    pub name: &'static str,
    pub arity: usize,
    pub func: NativeFn,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<native function {}>", self.name)
    }
}

/// The default registry, in declaration order.
pub fn standard() -> Vec<NativeFunction> {
    vec![
        NativeFunction {
            name: "clock",
            arity: 0,
            func: clock,
        },
        NativeFunction {
            name: "input",
            arity: 0,
            func: input,
        },
        NativeFunction {
            name: "len",
            arity: 1,
            func: len,
        },
        NativeFunction {
            name: "floor",
            arity: 1,
            func: floor,
        },
        NativeFunction {
            name: "parse_int",
            arity: 1,
            func: parse_int,
        },
        NativeFunction {
            name: "parse_float",
            arity: 1,
            func: parse_float,
        },
        NativeFunction {
            name: "to_string",
            arity: 1,
            func: to_string,
        },
    ]
}

fn clock(io: &mut dyn IoProvider, _args: &[Value]) -> Result<Value, String> {
    let now = io.clock();
    debug!("Native function 'clock' returned: {}", now);

    Ok(Value::Float(now))
}

fn input(io: &mut dyn IoProvider, _args: &[Value]) -> Result<Value, String> {
    Ok(io.read_line().map_or(Value::Nil, Value::from))
}

fn len(_io: &mut dyn IoProvider, args: &[Value]) -> Result<Value, String> {
    match args.first() {
        Some(Value::Str(s)) => Ok(Value::Int(s.chars().count() as i64)),
        _ => Err("len function only works with str".to_string()),
    }
}

fn floor(_io: &mut dyn IoProvider, args: &[Value]) -> Result<Value, String> {
    match args.first() {
        Some(Value::Int(n)) => Ok(Value::Int(*n)),
        Some(Value::Float(f)) => {
            let floored = f.floor();

            if floored >= i64::MIN as f64 && floored < i64::MAX as f64 {
                Ok(Value::Int(floored as i64))
            } else {
                Ok(Value::Float(floored))
            }
        }
        _ => Err("floor function only works with numeric values".to_string()),
    }
}

/// Like a "try parse": failure yields `nil` rather than an error.
fn parse_int(_io: &mut dyn IoProvider, args: &[Value]) -> Result<Value, String> {
    let parsed = match args.first() {
        Some(Value::Str(s)) => s.trim().parse::<i64>().ok(),
        Some(Value::Int(n)) => Some(*n),
        Some(Value::Float(f)) if f.is_finite() => Some(f.trunc() as i64),
        Some(Value::Bool(b)) => Some(i64::from(*b)),
        _ => None,
    };

    Ok(parsed.map_or(Value::Nil, Value::Int))
}

fn parse_float(_io: &mut dyn IoProvider, args: &[Value]) -> Result<Value, String> {
    let parsed = match args.first() {
        Some(Value::Str(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Int(n)) => Some(*n as f64),
        Some(Value::Float(f)) => Some(*f),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };

    Ok(parsed.map_or(Value::Nil, Value::Float))
}

fn to_string(_io: &mut dyn IoProvider, args: &[Value]) -> Result<Value, String> {
    Ok(Value::from(args.first().map(Value::to_string).unwrap_or_default()))
}
