//! Context stack lookup

use super::value::Value;

/// Look `key` up on a single scope.
///
/// Maps answer with their own entries (a present `Null` counts as found),
/// lists with index keys and `length`. Models answer only through their
/// getter and only when `model_get` is on.
pub(crate) fn find_in_scope(key: &str, scope: &Value, model_get: bool) -> Option<Value> {
    match scope {
        Value::Map(_) | Value::List(_) => scope.get(key),
        Value::Model(model) if model_get => model.get(key),
        _ => None,
    }
}

/// Simple lookup: the innermost scope that has `key` wins
pub(crate) fn lookup(key: &str, ctx: &[Value], model_get: bool) -> Option<Value> {
    ctx.iter()
        .rev()
        .find_map(|scope| find_in_scope(key, scope, model_get))
}

/// True while the innermost scope was pushed by iterating a list
pub(crate) fn is_iterating(ctx: &[Value]) -> bool {
    ctx.len() >= 2 && matches!(ctx[ctx.len() - 2], Value::List(_))
}
