//! Type predicates used by validators
use crate::limits::MAX_NESTING_DEPTH;
use crate::util;
use crate::value::Value;

pub fn is_hash(value: &Value) -> bool {
    value.is_object()
}

pub fn is_string(value: &Value) -> bool {
    value.is_string()
}

pub fn is_boolean(value: &Value) -> bool {
    value.is_boolean()
}

pub fn is_integer(value: &Value) -> bool {
    value.is_integer()
}

pub fn is_hash_or_string(value: &Value) -> bool {
    value.is_object() || value.is_string()
}

pub fn is_hash_or_boolean(value: &Value) -> bool {
    value.is_object() || value.is_boolean()
}

pub fn is_hash_or_integer(value: &Value) -> bool {
    value.is_object() || value.is_integer()
}

pub fn is_array_of_strings(value: &Value) -> bool {
    value.as_strings().is_some()
}

pub fn is_array_of_strings_or_string(value: &Value) -> bool {
    value.is_string() || is_array_of_strings(value)
}

pub fn is_array_of_hashes(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|array| array.iter().all(Value::is_object))
}

pub fn is_array_of_integers_or_integer(value: &Value) -> bool {
    value.is_integer()
        || value
            .as_array()
            .is_some_and(|array| array.iter().all(Value::is_integer))
}

pub fn is_boolean_or_array_of_strings(value: &Value) -> bool {
    value.is_boolean() || is_array_of_strings(value)
}

/// Array whose elements are strings or arrays nested up to the maximum depth
pub fn is_nested_array_of_strings(value: &Value) -> bool {
    value.is_array() && util::flatten_strings(value, MAX_NESTING_DEPTH).is_some()
}

pub fn is_string_or_nested_array_of_strings(value: &Value) -> bool {
    value.is_string() || is_nested_array_of_strings(value)
}

/// Variable interpolation (`$VAR`, `${VAR}`) anywhere in a string
pub fn has_variables(value: &str) -> bool {
    value.contains('$')
}
