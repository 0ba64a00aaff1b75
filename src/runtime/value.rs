//! Runtime value representation

use super::store::{ExternAddr, FuncAddr};
use super::Trap;
use crate::module::{RefType, ValueType};
use fhex::ToHex;
use std::fmt;

/// Runtime representation of WebAssembly values
///
/// Values are copied by value; references carry opaque Store addresses and
/// represent null as `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    FuncRef(Option<FuncAddr>),
    ExternRef(Option<ExternAddr>),
}

impl Value {
    /// Get the WebAssembly type of this value
    pub fn typ(&self) -> ValueType {
        match self {
            Value::I32(_) => ValueType::I32,
            Value::I64(_) => ValueType::I64,
            Value::F32(_) => ValueType::F32,
            Value::F64(_) => ValueType::F64,
            Value::FuncRef(_) => ValueType::FuncRef,
            Value::ExternRef(_) => ValueType::ExternRef,
        }
    }

    /// The zero value a local or table slot of the given type starts with
    pub fn zero(value_type: ValueType) -> Value {
        match value_type {
            ValueType::I32 => Value::I32(0),
            ValueType::I64 => Value::I64(0),
            ValueType::F32 => Value::F32(0.0),
            ValueType::F64 => Value::F64(0.0),
            ValueType::FuncRef => Value::FuncRef(None),
            ValueType::ExternRef => Value::ExternRef(None),
        }
    }

    /// The null reference of the given reference type
    pub fn null_ref(ref_type: RefType) -> Value {
        match ref_type {
            RefType::FuncRef => Value::FuncRef(None),
            RefType::ExternRef => Value::ExternRef(None),
        }
    }

    /// Convert to i32, returning None if wrong type
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to i64, returning None if wrong type
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to f32, returning None if wrong type
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    /// Convert to f64, returning None if wrong type
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// True for a reference value whose payload is null
    pub fn is_null_ref(&self) -> Result<bool, Trap> {
        match self {
            Value::FuncRef(r) => Ok(r.is_none()),
            Value::ExternRef(r) => Ok(r.is_none()),
            _ => Err(Trap::Internal("ref.is_null on a non-reference value")),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::I32(v) => write!(f, "i32:{v}"),
            Value::I64(v) => write!(f, "i64:{v}"),
            Value::F32(v) => write!(f, "f32:{}", v.to_hex()),
            Value::F64(v) => write!(f, "f64:{}", v.to_hex()),
            Value::FuncRef(None) => write!(f, "funcref:null"),
            Value::FuncRef(Some(addr)) => write!(f, "funcref:{}", addr.0),
            Value::ExternRef(None) => write!(f, "externref:null"),
            Value::ExternRef(Some(addr)) => write!(f, "externref:{}", addr.0),
        }
    }
}
