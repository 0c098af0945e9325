use crate::ast::{AngleMode, MathValue, Node};
use crate::error::{Error, Result};
use crate::functions::register_functions;
use log::debug;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type Function = Arc<dyn Fn(&[f64]) -> Result<f64> + Send + Sync>;

/// How a native function relates to angles, so degree mode knows what to
/// convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleUsage {
    None,
    /// Takes an angle (`sin`, `cos`, `tan`).
    Argument,
    /// Returns an angle (`asin`, `acos`, `atan`).
    Result,
}

#[derive(Clone)]
pub struct NativeFunction {
    pub function: Function,
    pub angle: AngleUsage,
}

impl NativeFunction {
    pub fn call(&self, args: &[f64], mode: AngleMode) -> Result<f64> {
        if mode == AngleMode::Radians || self.angle == AngleUsage::None {
            return (self.function)(args);
        }
        match self.angle {
            AngleUsage::Argument => {
                let radians: Vec<f64> = args.iter().map(|a| a.to_radians()).collect();
                (self.function)(&radians)
            }
            _ => (self.function)(args).map(f64::to_degrees),
        }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("angle", &self.angle)
            .finish_non_exhaustive()
    }
}

/// A user function registered from text such as `f(x, y) = x * y`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub params: Vec<String>,
    pub body: Node,
    /// The text the definition was parsed from.
    pub source: String,
}

/// One scope of variable bindings and function tables.
///
/// The root context owns the native table. Child contexts are created per
/// function call, borrow their parent for native lookup, and are dropped
/// when the call returns.
#[derive(Debug)]
pub struct EvalContext<'p> {
    variables: HashMap<String, MathValue>,
    functions: HashMap<String, Arc<FunctionDefinition>>,
    natives: HashMap<String, NativeFunction>,
    parent: Option<&'p EvalContext<'p>>,
}

impl Default for EvalContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'p> EvalContext<'p> {
    /// Root context with constants and the built-in natives.
    pub fn new() -> Self {
        let mut context = Self::empty(None);
        register_functions(&mut context);
        context
    }

    fn empty(parent: Option<&'p EvalContext<'p>>) -> Self {
        let mut variables = HashMap::new();
        variables.insert("e".to_string(), MathValue::Number(Decimal::E));
        variables.insert("π".to_string(), MathValue::Number(Decimal::PI));
        variables.insert("pi".to_string(), MathValue::Number(Decimal::PI));
        Self {
            variables,
            functions: HashMap::new(),
            natives: HashMap::new(),
            parent,
        }
    }

    /// Activation scope for a function call: constants and user functions,
    /// none of the caller's variables.
    pub fn child(&self) -> EvalContext<'_> {
        let mut child = EvalContext::empty(Some(self));
        child.functions = self.functions.clone();
        child
    }

    /// Like [`child`](Self::child) but keeps the caller's variables visible.
    pub fn inherit(&self) -> EvalContext<'_> {
        let mut scope = self.child();
        for (name, value) in &self.variables {
            scope.variables.insert(name.clone(), value.clone());
        }
        scope
    }

    pub fn bind(&mut self, name: impl Into<String>, value: MathValue) {
        self.variables.insert(name.into(), value);
    }

    pub fn unbind(&mut self, name: &str) -> Option<MathValue> {
        self.variables.remove(name)
    }

    pub fn variable(&self, name: &str) -> Option<&MathValue> {
        self.variables.get(name)
    }

    pub fn lookup_function(&self, name: &str) -> Option<Arc<FunctionDefinition>> {
        self.functions.get(name).cloned()
    }

    pub fn lookup_native(&self, name: &str) -> Option<&NativeFunction> {
        match self.natives.get(name) {
            Some(native) => Some(native),
            None => self.parent.and_then(|parent| parent.lookup_native(name)),
        }
    }

    /// Registers a user function. Names are unique per context.
    pub fn define(&mut self, definition: FunctionDefinition) -> Result<Arc<FunctionDefinition>> {
        if self.functions.contains_key(&definition.name) {
            return Err(Error::DuplicateFunction(definition.name));
        }
        debug!(
            "Registering function {}({})",
            definition.name,
            definition.params.join(", ")
        );
        let definition = Arc::new(definition);
        self.functions
            .insert(definition.name.clone(), Arc::clone(&definition));
        Ok(definition)
    }

    pub fn register_native<F>(&mut self, name: &str, function: F, angle: AngleUsage)
    where
        F: Fn(&[f64]) -> Result<f64> + Send + Sync + 'static,
    {
        self.natives.insert(
            name.to_string(),
            NativeFunction {
                function: Arc::new(function),
                angle,
            },
        );
    }

    /// Number of scopes above this one.
    pub fn depth(&self) -> usize {
        self.parent.map_or(0, |parent| parent.depth() + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Parser;

    fn definition(text: &str) -> FunctionDefinition {
        match Parser::parse(text).unwrap() {
            Node::FunctionDef { name, params, body } => FunctionDefinition {
                name,
                params,
                body: *body,
                source: text.to_string(),
            },
            other => panic!("not a definition: {:?}", other),
        }
    }

    #[test]
    fn test_root_constants() {
        let context = EvalContext::new();
        assert_eq!(context.variable("pi"), Some(&MathValue::Number(Decimal::PI)));
        assert_eq!(context.variable("π"), Some(&MathValue::Number(Decimal::PI)));
        assert!(context.variable("e").is_some());
        assert!(context.variable("x").is_none());
    }

    #[test]
    fn test_child_does_not_see_caller_variables() {
        let mut root = EvalContext::new();
        root.bind("x", MathValue::from(5));
        root.define(definition("f(a) = a")).unwrap();

        let child = root.child();
        assert!(child.variable("x").is_none());
        assert!(child.variable("e").is_some());
        assert!(child.lookup_function("f").is_some());
        assert!(child.lookup_native("sin").is_some());
        assert_eq!(child.depth(), 1);

        let scope = root.inherit();
        assert_eq!(scope.variable("x"), Some(&MathValue::from(5)));
    }

    #[test]
    fn test_duplicate_definition() {
        let mut root = EvalContext::new();
        root.define(definition("f(x) = x")).unwrap();
        let result = root.define(definition("f(y) = y + 1"));
        assert_eq!(result, Err(Error::DuplicateFunction("f".to_string())));
    }

    #[test]
    fn test_degree_conversion() {
        let root = EvalContext::new();
        let sin = root.lookup_native("sin").unwrap();
        let value = sin.call(&[90.0], AngleMode::Degrees).unwrap();
        assert!((value - 1.0).abs() < 1e-12);

        let atan = root.lookup_native("atan").unwrap();
        let value = atan.call(&[1.0], AngleMode::Degrees).unwrap();
        assert!((value - 45.0).abs() < 1e-12);
    }
}
