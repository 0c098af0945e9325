use crate::ast::{AngleUsage, EvalContext};
use crate::error::Result;
use vectrix_macros::vectrix_fn;

pub fn register(context: &mut EvalContext) {
    context.register_native("sin", sin, AngleUsage::Argument);
    context.register_native("cos", cos, AngleUsage::Argument);
    context.register_native("tan", tan, AngleUsage::Argument);
    context.register_native("asin", asin, AngleUsage::Result);
    context.register_native("acos", acos, AngleUsage::Result);
    context.register_native("atan", atan, AngleUsage::Result);
    context.register_native("sinh", sinh, AngleUsage::None);
    context.register_native("cosh", cosh, AngleUsage::None);
    context.register_native("tanh", tanh, AngleUsage::None);
}

#[vectrix_fn]
fn sin(x: f64) -> Result<f64> {
    Ok(x.sin())
}

#[vectrix_fn]
fn cos(x: f64) -> Result<f64> {
    Ok(x.cos())
}

#[vectrix_fn]
fn tan(x: f64) -> Result<f64> {
    Ok(x.tan())
}

#[vectrix_fn]
fn asin(x: f64) -> Result<f64> {
    Ok(x.asin())
}

#[vectrix_fn]
fn acos(x: f64) -> Result<f64> {
    Ok(x.acos())
}

#[vectrix_fn]
fn atan(x: f64) -> Result<f64> {
    Ok(x.atan())
}

#[vectrix_fn]
fn sinh(x: f64) -> Result<f64> {
    Ok(x.sinh())
}

#[vectrix_fn]
fn cosh(x: f64) -> Result<f64> {
    Ok(x.cosh())
}

#[vectrix_fn]
fn tanh(x: f64) -> Result<f64> {
    Ok(x.tanh())
}
