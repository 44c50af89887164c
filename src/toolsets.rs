//! Built-in tool sources
//!
//! Each source is a registration table: function name, doc block, formal
//! parameters and a positional invoker.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::warn;

use crate::domain::catalog::{DeclaredFunction, DeclaredParam, ToolSource};
use crate::errors::ToolError;

pub struct MathTools;

impl ToolSource for MathTools {
    fn name(&self) -> &str {
        "MathTools"
    }

    fn functions(&self) -> Vec<DeclaredFunction> {
        vec![
            DeclaredFunction::new(
                "add",
                "/**
                 * Add two numbers.
                 *
                 * @param float $a First addend
                 * @param float $b Second addend
                 * @return float The sum
                 */",
                |args| arithmetic(&args, i64::checked_add, |a, b| a + b),
            )
            .param(DeclaredParam::required("a"))
            .param(DeclaredParam::required("b")),
            DeclaredFunction::new(
                "subtract",
                "/**
                 * Subtract the second number from the first.
                 *
                 * @param float $a Minuend
                 * @param float $b Subtrahend
                 * @return float The difference
                 */",
                |args| arithmetic(&args, i64::checked_sub, |a, b| a - b),
            )
            .param(DeclaredParam::required("a"))
            .param(DeclaredParam::required("b")),
            DeclaredFunction::new(
                "multiply",
                "/**
                 * Multiply two numbers.
                 *
                 * @param float $a First factor
                 * @param float $b Second factor
                 * @return float The product
                 */",
                |args| arithmetic(&args, i64::checked_mul, |a, b| a * b),
            )
            .param(DeclaredParam::required("a"))
            .param(DeclaredParam::required("b")),
            DeclaredFunction::new(
                "divide",
                "/**
                 * Divide the first number by the second.
                 *
                 * @param float $a Dividend
                 * @param float $b Divisor, must not be zero
                 * @return float The quotient
                 */",
                |args| {
                    let a = number_arg(&args, 0, "a")?;
                    let b = number_arg(&args, 1, "b")?;
                    if b == 0.0 {
                        return Err(ToolError::execution("Division by zero"));
                    }
                    finite(a / b)
                },
            )
            .param(DeclaredParam::required("a"))
            .param(DeclaredParam::required("b")),
        ]
    }
}

pub struct TextTools;

impl ToolSource for TextTools {
    fn name(&self) -> &str {
        "TextTools"
    }

    fn functions(&self) -> Vec<DeclaredFunction> {
        vec![
            DeclaredFunction::new(
                "reverse",
                "/**
                 * Reverse a string character by character.
                 *
                 * @param string $text Text to reverse
                 * @return string The reversed text
                 */",
                |args| {
                    let text = string_arg(&args, 0, "text")?;
                    Ok(json!(text.chars().rev().collect::<String>()))
                },
            )
            .param(DeclaredParam::required("text").typed("string")),
            DeclaredFunction::new(
                "wordCount",
                "/**
                 * Count whitespace separated words.
                 *
                 * @param string $text Text to analyze
                 * @return int Number of words
                 */",
                |args| {
                    let text = string_arg(&args, 0, "text")?;
                    Ok(json!(text.split_whitespace().count()))
                },
            )
            .param(DeclaredParam::required("text").typed("string")),
            DeclaredFunction::new(
                "repeat",
                "/**
                 * Repeat a string a number of times.
                 *
                 * @param string $text Text to repeat
                 * @param int $times How many copies to join
                 * @param string $separator Placed between copies
                 * @return string The repeated text
                 */",
                |args| {
                    let text = string_arg(&args, 0, "text")?;
                    let times = args
                        .get(1)
                        .and_then(Value::as_u64)
                        .filter(|times| *times <= 1000)
                        .ok_or_else(|| {
                            ToolError::invalid_argument("times", "must be an integer from 0 to 1000")
                        })?;
                    let separator = string_arg(&args, 2, "separator")?;
                    Ok(json!(vec![text; times as usize].join(separator)))
                },
            )
            .param(DeclaredParam::required("text").typed("string"))
            .param(DeclaredParam::optional("times", json!(2)).typed("int"))
            .param(DeclaredParam::optional("separator", json!("")).typed("string")),
            DeclaredFunction::new(
                "toUpperCase",
                "/**
                 * Convert text to upper case.
                 *
                 * @param string $text Text to convert
                 * @return string Upper-cased text
                 */",
                |args| {
                    let text = string_arg(&args, 0, "text")?;
                    Ok(json!(text.to_uppercase()))
                },
            )
            .param(DeclaredParam::required("text").typed("string")),
        ]
    }
}

pub fn builtin_sources() -> Vec<Arc<dyn ToolSource>> {
    vec![Arc::new(MathTools) as Arc<dyn ToolSource>, Arc::new(TextTools)]
}

/// Picks built-in sources by name (`MathTools` or `math`, case-insensitive). `None` selects all.
pub fn select_sources(names: Option<&[String]>) -> Vec<Arc<dyn ToolSource>> {
    let available = builtin_sources();
    let Some(names) = names else {
        return available;
    };

    let mut selected = Vec::new();
    for name in names {
        let wanted = name.trim().to_ascii_lowercase();
        let found = available.iter().find(|source| {
            let source_name = source.name().to_ascii_lowercase();
            source_name == wanted || source_name.strip_suffix("tools") == Some(wanted.as_str())
        });
        match found {
            Some(source) => selected.push(Arc::clone(source)),
            None => warn!(source = %name, "unknown tool source; skipping"),
        }
    }
    selected
}

fn arithmetic(
    args: &[Value],
    integer_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, ToolError> {
    let integers = (
        args.first().and_then(Value::as_i64),
        args.get(1).and_then(Value::as_i64),
    );
    if let (Some(a), Some(b)) = integers {
        if let Some(result) = integer_op(a, b) {
            return Ok(json!(result));
        }
    }

    let a = number_arg(args, 0, "a")?;
    let b = number_arg(args, 1, "b")?;
    finite(float_op(a, b))
}

/// JSON has no encoding for infinities or NaN.
fn finite(result: f64) -> Result<Value, ToolError> {
    if result.is_finite() {
        Ok(json!(result))
    } else {
        Err(ToolError::execution("result is not a finite number"))
    }
}

/// Accepts JSON numbers and numeric strings.
fn number_arg(args: &[Value], index: usize, name: &str) -> Result<f64, ToolError> {
    let value = args.get(index).unwrap_or(&Value::Null);
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|number| number.is_finite())
    .ok_or_else(|| ToolError::invalid_argument(name, "must be a number"))
}

fn string_arg<'a>(args: &'a [Value], index: usize, name: &str) -> Result<&'a str, ToolError> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| ToolError::invalid_argument(name, "must be a string"))
}
