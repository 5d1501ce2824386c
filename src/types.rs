//! Type registry
//!
//! Maps custom type names to a base primitive and a validator callable.
//! A small built-in set (`ipv4`, `ipv6`, `cidr`, `email`, `uuid`, all
//! base `Str`) is registered by default.

use crate::error::{ErrorContext, OperatorConflictError};
use crate::schema::Primitive;
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// A type validator: `value -> bool`. Exceptions inside a caller-
/// supplied validator are not representable in Rust as panics-to-catch
/// in the general case, so validators are plain `Fn` closures — a
/// closure that can't fail returns `false` for invalid input rather
/// than panicking, by convention (see `validate`, which also catches
/// unwinds as a last resort for ported/foreign validators).
pub type Validator = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

#[derive(Clone)]
struct CustomType {
    base: Primitive,
    validator: Validator,
}

#[derive(Default)]
pub struct TypeRegistry {
    types: HashMap<String, CustomType>,
    struct_names: Vec<String>,
    frozen: bool,
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = Self::default();
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        self.insert_unchecked("ipv4", Primitive::Str, Arc::new(validate_ipv4));
        self.insert_unchecked("ipv6", Primitive::Str, Arc::new(validate_ipv6));
        self.insert_unchecked("cidr", Primitive::Str, Arc::new(validate_cidr));
        self.insert_unchecked("email", Primitive::Str, Arc::new(validate_email));
        self.insert_unchecked("uuid", Primitive::Str, Arc::new(validate_uuid));
    }

    fn insert_unchecked(&mut self, name: &str, base: Primitive, validator: Validator) {
        self.types
            .insert(name.to_string(), CustomType { base, validator });
    }

    /// `struct_names` lets registration reject a custom type name that
    /// collides with a struct already declared in the schema (spec.md
    /// §4.4). Called by the engine builder each time a struct schema is
    /// (re-)loaded; harmless to call with an empty slice before the
    /// schema exists yet.
    pub fn set_known_struct_names(&mut self, struct_names: Vec<String>) {
        self.struct_names = struct_names;
    }

    pub fn register_type(
        &mut self,
        name: &str,
        base: Primitive,
        validator: Validator,
    ) -> Result<(), OperatorConflictError> {
        if self.frozen {
            return Err(OperatorConflictError {
                message: "type registry is frozen".to_string(),
                context: ErrorContext::new().field(name),
            });
        }
        if Primitive::parse(name).is_some() {
            return Err(OperatorConflictError {
                message: format!("type name '{name}' collides with a primitive"),
                context: ErrorContext::new().field(name),
            });
        }
        if self.struct_names.iter().any(|s| s == name) {
            return Err(OperatorConflictError {
                message: format!("type name '{name}' collides with a declared struct"),
                context: ErrorContext::new().field(name),
            });
        }
        if self.types.contains_key(name) {
            return Err(OperatorConflictError {
                message: format!("type '{name}' is already registered"),
                context: ErrorContext::new().field(name),
            });
        }
        self.insert_unchecked(name, base, validator);
        Ok(())
    }

    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn get_base(&self, name: &str) -> Option<Primitive> {
        self.types.get(name).map(|t| t.base)
    }

    /// Runs the registered validator for `name` against `value`.
    /// Returns `false` for unknown type names — callers that need to
    /// distinguish "unknown type" from "invalid value" should check
    /// `has_type` first. A validator that panics is treated the same as
    /// one that returns `false` (spec.md §4.4: "exceptions inside the
    /// validator are treated as validation failure").
    pub fn validate(&self, name: &str, value: &Value) -> bool {
        use std::panic::{AssertUnwindSafe, catch_unwind};
        match self.types.get(name) {
            Some(t) => catch_unwind(AssertUnwindSafe(|| (t.validator)(value))).unwrap_or(false),
            None => false,
        }
    }

    pub fn custom_type_names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }
}

fn as_str_or_false(value: &Value) -> Option<&str> {
    value.as_str()
}

fn validate_ipv4(value: &Value) -> bool {
    let Some(s) = as_str_or_false(value) else {
        return false;
    };
    let parts: Vec<&str> = s.split('.').collect();
    parts.len() == 4 && parts.iter().all(|p| p.parse::<u8>().is_ok() && !p.is_empty())
}

fn validate_ipv6(value: &Value) -> bool {
    let Some(s) = as_str_or_false(value) else {
        return false;
    };
    s.parse::<std::net::Ipv6Addr>().is_ok()
}

fn validate_cidr(value: &Value) -> bool {
    let Some(s) = as_str_or_false(value) else {
        return false;
    };
    let Some((addr, prefix)) = s.split_once('/') else {
        return false;
    };
    let Ok(prefix_len) = prefix.parse::<u8>() else {
        return false;
    };
    if addr.contains(':') {
        addr.parse::<std::net::Ipv6Addr>().is_ok() && prefix_len <= 128
    } else {
        validate_ipv4(&Value::Str(addr.to_string())) && prefix_len <= 32
    }
}

fn validate_email(value: &Value) -> bool {
    let Some(s) = as_str_or_false(value) else {
        return false;
    };
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn validate_uuid(value: &Value) -> bool {
    let Some(s) = as_str_or_false(value) else {
        return false;
    };
    let parts: Vec<&str> = s.split('-').collect();
    let lengths = [8, 4, 4, 4, 12];
    parts.len() == 5
        && parts
            .iter()
            .zip(lengths)
            .all(|(p, len)| p.len() == len && p.chars().all(|c| c.is_ascii_hexdigit()))
}
