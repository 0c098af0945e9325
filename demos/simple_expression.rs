use vectrix_rs::ast::{AngleMode, Evaluator};

fn main() {
    pretty_env_logger::init();

    let mut evaluator = Evaluator::new(100);
    evaluator.define_function("f(x, y) = x^3 - 2y").unwrap();

    for expression in ["2 + 3 * 4", "f(3, 5)", "int(x^2, x, 0, 3)", "2x + 1"] {
        match evaluator.evaluate_expression(expression) {
            Ok(result) => println!("{} = {}", expression, result),
            Err(err) => println!("{}: {}", expression, err),
        }
    }

    evaluator.set_angle_mode(AngleMode::Degrees);
    println!("sin(30) = {}", evaluator.evaluate_expression("sin(30)").unwrap());

    match evaluator.differentiate("x^2 + 2x - 8", "x") {
        Ok(derivative) => println!("d/dx (x^2 + 2x - 8) = {}", derivative),
        Err(err) => println!("Error: {}", err),
    }
}
