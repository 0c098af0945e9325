use rust_decimal::Decimal;
use std::collections::HashMap;
use vectrix_rs::ast::Evaluator;
use vectrix_rs::MathValue;

fn main() {
    pretty_env_logger::init();

    let mut evaluator = Evaluator::new(100);

    let expression = "price * volume > 250000";
    let ast = evaluator
        .parse_expression(expression)
        .expect("Failed to parse");
    println!("Parsed: {}", ast);

    let context: HashMap<String, MathValue> = [
        ("price".to_string(), MathValue::from(Decimal::new(1205, 1))),
        ("volume".to_string(), MathValue::from(3000)),
    ]
    .into_iter()
    .collect();

    match evaluator.evaluate_with(expression, &context) {
        Ok(result) => println!("Result: {}", result),
        Err(err) => println!("Error: {}", err),
    }

    // unbound names stay symbolic
    match evaluator.evaluate_ast(&ast) {
        Ok(result) => println!("Symbolic: {}", result),
        Err(err) => println!("Error: {}", err),
    }
}
