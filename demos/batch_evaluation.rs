use log::debug;
use vectrix_rs::ast::Evaluator;
use vectrix_rs::matrix::{characteristic_polynomial, determinant, invert, row_reduce};

fn main() {
    pretty_env_logger::init();

    let mut evaluator = Evaluator::new(100);

    let matrices = ["[2 1][1 2]", "[1 3 5][8 30 2][1 89 2]", "[1 2][2 4]"];

    for (i, text) in matrices.iter().enumerate() {
        let matrix = match evaluator.matrix(text) {
            Ok(matrix) => matrix,
            Err(err) => {
                println!("Matrix {}: {}", i, err);
                continue;
            }
        };
        debug!("matrix {}: {:?}", i, matrix);

        println!("Matrix {}:\n{}", i, matrix);
        println!("det = {}", determinant(&matrix).unwrap());
        println!("rref =\n{}", row_reduce(&matrix).unwrap());
        match invert(&matrix) {
            Ok(inverse) => println!("inverse =\n{}", inverse),
            Err(err) => println!("inverse: {}", err),
        }
        println!(
            "characteristic polynomial = {}",
            characteristic_polynomial(&matrix, "t").unwrap()
        );
    }
}
