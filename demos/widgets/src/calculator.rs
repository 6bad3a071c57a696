//! Calculator key handling
//!
//! Operators chain left to right: pressing an operator while one is pending
//! evaluates the pending operation first.

use crate::state::Calculator;

/// Keys in display order
pub const KEYS: [&str; 17] = [
    "7", "8", "9", "/", "4", "5", "6", "*", "1", "2", "3", "-", "0", ".", "=", "+", "C",
];

fn is_operator(c: char) -> bool {
    matches!(c, '+' | '-' | '*' | '/')
}

/// Number formatting matching what the display shows
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n == f64::INFINITY {
        "Infinity".to_string()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".to_string()
    } else {
        n.to_string()
    }
}

fn display_value(display: &str) -> f64 {
    display.parse().unwrap_or(0.0)
}

/// Apply the pending operator to the first operand and the display
pub fn evaluate(calc: &Calculator) -> f64 {
    let input = display_value(&calc.display);
    let first = calc.first_operand.unwrap_or(0.0);
    match calc.operator {
        Some('+') => first + input,
        Some('-') => first - input,
        Some('*') => first * input,
        Some('/') => first / input,
        _ => input,
    }
}

/// Calculator state after pressing `key`, `None` if the key does nothing
pub fn press(calc: &Calculator, key: &str) -> Option<Calculator> {
    let mut next = calc.clone();
    let mut chars = key.chars();
    let single = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return None,
    };

    match single {
        '.' => {
            if calc.display.contains('.') {
                return None;
            }
            next.display.push('.');
        }
        op if is_operator(op) => {
            if calc.operator.is_some() && calc.waiting_for_second_operand {
                next.operator = Some(op);
                return Some(next);
            }
            if calc.first_operand.is_none() {
                next.first_operand = Some(display_value(&calc.display));
            } else if calc.operator.is_some() {
                let result = evaluate(calc);
                next.display = format_number(result);
                next.first_operand = Some(result);
            }
            next.waiting_for_second_operand = true;
            next.operator = Some(op);
        }
        '=' => {
            if calc.operator.is_none() || calc.first_operand.is_none() {
                return None;
            }
            let result = evaluate(calc);
            next.display = format_number(result);
            next.first_operand = Some(result);
            next.operator = None;
            next.waiting_for_second_operand = false;
        }
        'C' => return Some(Calculator::default()),
        digit if digit.is_ascii_digit() => {
            if calc.waiting_for_second_operand {
                next.display = key.to_string();
                next.waiting_for_second_operand = false;
            } else if calc.display == "0" {
                next.display = key.to_string();
            } else {
                next.display.push(digit);
            }
        }
        _ => return None,
    }
    Some(next)
}
