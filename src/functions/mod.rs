pub mod other;
pub mod trig;

use crate::ast::EvalContext;

/// Installs every built-in native into a root context.
pub fn register_functions(context: &mut EvalContext) {
    trig::register(context);
    other::register(context);
}
