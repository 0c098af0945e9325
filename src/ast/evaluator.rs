use crate::ast::{
    power, AngleMode, AngleUsage, EvalConfig, EvalContext, FunctionDefinition, MathValue, Node,
    Operator, Parser, MAX_PRECISION,
};
use crate::calculus;
use crate::error::{Error, Result};
use crate::matrix::Matrix;
use log::debug;
use lru::LruCache;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Name of the definite-integral special form.
const INTEGRAL: &str = "int";

pub struct Evaluator {
    config: EvalConfig,
    context: EvalContext<'static>,
    cache: LruCache<String, Arc<Node>>,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::with_config(EvalConfig::default())
    }
}

impl Evaluator {
    /// Creates a new `Evaluator` keeping up to `max_cache_size` parsed
    /// expressions.
    pub fn new(max_cache_size: usize) -> Self {
        Self::with_config(EvalConfig::default().with_cache_size(max_cache_size))
    }

    pub fn with_config(config: EvalConfig) -> Self {
        let capacity = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            context: EvalContext::new(),
            cache: LruCache::new(capacity),
        }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn context(&self) -> &EvalContext<'static> {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut EvalContext<'static> {
        &mut self.context
    }

    pub fn set_precision(&mut self, precision: u32) {
        self.config.precision = precision.min(MAX_PRECISION);
    }

    pub fn set_angle_mode(&mut self, angle_mode: AngleMode) {
        self.config.angle_mode = angle_mode;
    }

    /// Binds a variable in the root context.
    pub fn bind_variable(&mut self, name: &str, value: impl Into<MathValue>) {
        self.context.bind(name, value.into());
    }

    /// Registers an extra native function.
    pub fn register_function<F>(&mut self, name: &str, function: F)
    where
        F: Fn(&[f64]) -> Result<f64> + Send + Sync + 'static,
    {
        self.context
            .register_native(name, function, AngleUsage::None);
    }

    /// Parse an expression string into an AST, reusing a cached tree when the
    /// same text was parsed before.
    pub fn parse_expression(&mut self, expression: &str) -> Result<Arc<Node>> {
        if let Some(ast) = self.cache.get(expression) {
            return Ok(Arc::clone(ast));
        }
        let ast = Arc::new(Parser::parse_with_max_depth(
            expression,
            self.config.max_depth,
        )?);
        self.cache.put(expression.to_string(), Arc::clone(&ast));
        Ok(ast)
    }

    /// Evaluates `expression` against the root context.
    ///
    /// Blank input evaluates to zero. Numeric results are snapped to zero
    /// within [`EPSILON`](crate::ast::EPSILON) and rounded to the configured
    /// precision.
    pub fn evaluate_expression(&mut self, expression: &str) -> Result<MathValue> {
        if expression.trim().is_empty() {
            return Ok(MathValue::Number(Decimal::ZERO));
        }
        let ast = self.parse_expression(expression)?;
        self.evaluate_ast(&ast)
    }

    /// Like [`evaluate_expression`](Self::evaluate_expression) with extra
    /// bindings layered over the root variables for this call only.
    pub fn evaluate_with(
        &mut self,
        expression: &str,
        bindings: &HashMap<String, MathValue>,
    ) -> Result<MathValue> {
        if expression.trim().is_empty() {
            return Ok(MathValue::Number(Decimal::ZERO));
        }
        let ast = self.parse_expression(expression)?;
        let mut scope = self.context.inherit();
        for (name, value) in bindings {
            scope.bind(name.clone(), value.clone());
        }
        let value = self.evaluate(&ast, &scope)?;
        Ok(value.rounded(self.config.precision))
    }

    /// Evaluates an already parsed tree against the root context.
    pub fn evaluate_ast(&self, ast: &Node) -> Result<MathValue> {
        let value = self.evaluate(ast, &self.context)?;
        Ok(value.rounded(self.config.precision))
    }

    /// Reduces `node` in `context` without final rounding.
    pub fn evaluate(&self, node: &Node, context: &EvalContext) -> Result<MathValue> {
        self.eval_node(node, context, 0)
    }

    fn eval_node(&self, node: &Node, context: &EvalContext, depth: usize) -> Result<MathValue> {
        if depth > self.config.max_depth {
            return Err(Error::DepthExceeded {
                limit: self.config.max_depth,
            });
        }

        match node {
            Node::Number(value) => Ok(MathValue::Number(*value)),

            Node::Variable { name, term } => {
                let value = context.variable(name).cloned();
                match (value, term) {
                    (Some(value), None) => Ok(value),
                    (None, None) => Ok(MathValue::symbol(name.as_str())),
                    (Some(MathValue::Number(base)), Some(term)) => {
                        let scaled = Operator::Multiply
                            .apply(term.coefficient, power(base, term.exponent)?)?;
                        Ok(MathValue::Number(scaled))
                    }
                    (Some(MathValue::Symbolic(text)), Some(term)) => {
                        Ok(MathValue::symbol(term.render(&format!("({})", text))))
                    }
                    (None, Some(term)) => Ok(MathValue::symbol(term.render(name))),
                }
            }

            Node::Unary { sign, operand } => {
                Ok(self.eval_node(operand, context, depth + 1)?.apply_sign(*sign))
            }

            Node::Binary {
                left,
                operator,
                right,
            } => {
                let left_value = self.eval_node(left, context, depth + 1)?;
                let right_value = self.eval_node(right, context, depth + 1)?;
                left_value.combine(*operator, &right_value)
            }

            Node::FunctionCall { name, args } => self.call_function(name, args, context, depth),

            Node::Vector(_) | Node::Matrix(_) | Node::FunctionDef { .. } => {
                Err(Error::NotScalar(node.kind()))
            }
        }
    }

    fn call_function(
        &self,
        name: &str,
        args: &[Node],
        context: &EvalContext,
        depth: usize,
    ) -> Result<MathValue> {
        if let Some(function) = context.lookup_function(name) {
            if args.len() != function.params.len() {
                return Err(Error::Arity {
                    name: name.to_string(),
                    expected: function.params.len(),
                    found: args.len(),
                });
            }

            // arguments are evaluated in the caller's scope
            let mut child = context.child();
            for (param, arg) in function.params.iter().zip(args) {
                let value = self.eval_node(arg, context, depth + 1)?;
                child.bind(param.clone(), value);
            }
            debug!("Calling {} at scope depth {}", name, child.depth());
            return self.eval_node(&function.body, &child, depth + 1);
        }

        if name == INTEGRAL {
            return self.integral(args, context, depth);
        }

        let native = context
            .lookup_native(name)
            .ok_or_else(|| Error::UnresolvedFunction(name.to_string()))?;

        let values = args
            .iter()
            .map(|arg| self.eval_node(arg, context, depth + 1))
            .collect::<Result<Vec<_>>>()?;

        if values.iter().any(MathValue::is_symbolic) {
            let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            return Ok(MathValue::symbol(format!("{}({})", name, rendered.join(", "))));
        }

        let numbers = values
            .iter()
            .map(|value| {
                value.as_f64().ok_or_else(|| {
                    Error::arithmetic(format!("{} cannot be passed to {}", value, name))
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        MathValue::from_f64(native.call(&numbers, self.config.angle_mode)?)
    }

    /// `int(body, x, a, b)`: the body is evaluated with `x` rebound at every
    /// sample while the caller's bindings stay visible.
    fn integral(&self, args: &[Node], context: &EvalContext, depth: usize) -> Result<MathValue> {
        if args.len() != 4 {
            return Err(Error::Arity {
                name: INTEGRAL.to_string(),
                expected: 4,
                found: args.len(),
            });
        }
        let variable = match &args[1] {
            Node::Variable { name, term: None } => name.as_str(),
            other => {
                return Err(Error::Unsupported(format!(
                    "the variable of integration must be a plain name, found {}",
                    other.kind()
                )))
            }
        };
        let lower = self.numeric_bound(&args[2], context, depth)?;
        let upper = self.numeric_bound(&args[3], context, depth)?;

        self.integrate_node(&args[0], variable, lower, upper, context, depth)
    }

    fn numeric_bound(&self, node: &Node, context: &EvalContext, depth: usize) -> Result<Decimal> {
        let value = self.eval_node(node, context, depth + 1)?;
        value
            .as_number()
            .ok_or_else(|| Error::arithmetic(format!("integration bound {} is not numeric", value)))
    }

    fn integrate_node(
        &self,
        body: &Node,
        variable: &str,
        lower: Decimal,
        upper: Decimal,
        context: &EvalContext,
        depth: usize,
    ) -> Result<MathValue> {
        let mut scope = context.inherit();
        let area = calculus::simpson(lower, upper, calculus::INTERVALS, |x| {
            scope.bind(variable, MathValue::Number(x));
            let value = self.eval_node(body, &scope, depth + 1)?;
            value.as_number().ok_or_else(|| {
                Error::arithmetic(format!("integrand {} is not numeric", value))
            })
        })?;
        Ok(MathValue::Number(area))
    }

    /// Numerically integrates `body` over `variable` from `lower` to `upper`.
    pub fn integrate(
        &mut self,
        body: &str,
        variable: &str,
        lower: Decimal,
        upper: Decimal,
    ) -> Result<MathValue> {
        let ast = self.parse_expression(body)?;
        let area = self.integrate_node(&ast, variable, lower, upper, &self.context, 0)?;
        Ok(area.rounded(self.config.precision))
    }

    /// Parses and registers a definition such as `f(x, y) = x^2 + y`.
    pub fn define_function(&mut self, definition: &str) -> Result<Arc<FunctionDefinition>> {
        let ast = Parser::parse_with_max_depth(definition, self.config.max_depth)?;
        match ast {
            Node::FunctionDef { name, params, body } => self.context.define(FunctionDefinition {
                name,
                params,
                body: *body,
                source: definition.trim().to_string(),
            }),
            other => Err(Error::parse(
                format!("expected a function definition, found a {}", other.kind()),
                0,
            )),
        }
    }

    /// Builds a matrix from literal text such as `[1 3 5][8 30 2][1 89 2]`.
    /// Each bracketed group is one column.
    pub fn matrix(&mut self, text: &str) -> Result<Matrix> {
        let ast = self.parse_expression(text)?;
        self.build_matrix(&ast, &self.context)
    }

    pub fn build_matrix(&self, node: &Node, context: &EvalContext) -> Result<Matrix> {
        let Node::Matrix(vectors) = node else {
            return Err(Error::shape(format!("expected a matrix literal, found a {}", node.kind())));
        };

        let mut columns = Vec::with_capacity(vectors.len());
        for vector in vectors {
            let Node::Vector(elements) = vector else {
                return Err(Error::shape(format!("expected a vector, found a {}", vector.kind())));
            };
            let column = elements
                .iter()
                .map(|element| {
                    self.evaluate(element, context)
                        .map(|value| value.rounded(self.config.precision))
                })
                .collect::<Result<Vec<_>>>()?;
            columns.push(column);
        }

        Matrix::from_columns(columns)
    }

    /// First derivative of `expression` with respect to `variable`.
    pub fn differentiate(&mut self, expression: &str, variable: &str) -> Result<MathValue> {
        let ast = self.parse_expression(expression)?;
        calculus::differentiate(self, &ast, variable)
    }
}
