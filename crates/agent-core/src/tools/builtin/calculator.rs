//! Arithmetic expression evaluation tool

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::tools::{ParameterProperty, ParameterSchema, Tool, ToolOutput};

/// Tool for evaluating arithmetic expressions
pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluate an arithmetic expression. Supports + - * / % ^, parentheses, \
         constants (pi, e) and functions (sqrt, abs, sin, cos, tan, ln, log, floor, ceil, round)."
    }

    fn category(&self) -> Option<&str> {
        Some("math")
    }

    fn parameters_schema(&self) -> ParameterSchema {
        ParameterSchema::new()
            .with_required("expression", ParameterProperty::string("Expression to evaluate, e.g. '2 + 3 * 4'"))
    }

    async fn execute(&self, args: &Map<String, Value>) -> Result<ToolOutput> {
        let expression = args
            .get("expression")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("Missing required parameter: expression"))?;

        let result = evaluate(expression)?;
        if !result.is_finite() {
            bail!("Expression '{}' does not evaluate to a finite number", expression);
        }

        Ok(ToolOutput::Data(json!({
            "expression": expression,
            "result": result,
        })))
    }
}

/// Longest expression accepted, in characters
const MAX_EXPRESSION_LEN: usize = 4096;

/// Deepest nesting of parentheses, function calls, signs and powers
const MAX_DEPTH: usize = 128;

/// Evaluate an arithmetic expression
pub fn evaluate(expression: &str) -> Result<f64> {
    if expression.chars().count() > MAX_EXPRESSION_LEN {
        bail!("Expression is longer than {} characters", MAX_EXPRESSION_LEN);
    }
    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expression()?;
    if parser.pos != parser.tokens.len() {
        bail!("Unexpected token {:?} in expression", parser.tokens[parser.pos]);
    }
    Ok(value)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| anyhow!("Invalid number '{}'", text))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect::<String>().to_lowercase()));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            other => bail!("Unexpected character '{}' in expression", other),
        }
    }

    if tokens.is_empty() {
        bail!("Expression is empty");
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    // expression := term (('+' | '-') term)*
    fn expression(&mut self) -> Result<f64> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := unary (('*' | '/' | '%') unary)*
    fn term(&mut self) -> Result<f64> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                '/' => {
                    if rhs == 0.0 {
                        bail!("Division by zero");
                    }
                    value / rhs
                }
                _ => {
                    if rhs == 0.0 {
                        bail!("Modulo by zero");
                    }
                    value % rhs
                }
            };
        }
        Ok(value)
    }

    // Every recursive path re-enters through here
    fn unary(&mut self) -> Result<f64> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            bail!("Expression nested too deeply (limit {})", MAX_DEPTH);
        }
        let value = self.signed();
        self.depth -= 1;
        value
    }

    // unary := ('-' | '+') unary | power
    fn signed(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    // power := primary ('^' unary)?   (right associative)
    fn power(&mut self) -> Result<f64> {
        let base = self.primary()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<f64> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expression()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => bail!("Missing closing parenthesis"),
                }
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "pi" => Ok(std::f64::consts::PI),
                "e" => Ok(std::f64::consts::E),
                _ => {
                    if self.next() != Some(Token::LParen) {
                        bail!("Unknown identifier '{}'", name);
                    }
                    let arg = self.expression()?;
                    if self.next() != Some(Token::RParen) {
                        bail!("Missing closing parenthesis after {}(...)", name);
                    }
                    apply_function(&name, arg)
                }
            },
            Some(token) => bail!("Unexpected token {:?}", token),
            None => bail!("Unexpected end of expression"),
        }
    }
}

fn apply_function(name: &str, arg: f64) -> Result<f64> {
    let value = match name {
        "sqrt" => {
            if arg < 0.0 {
                bail!("sqrt of a negative number");
            }
            arg.sqrt()
        }
        "abs" => arg.abs(),
        "sin" => arg.sin(),
        "cos" => arg.cos(),
        "tan" => arg.tan(),
        "ln" => arg.ln(),
        "log" => arg.log10(),
        "floor" => arg.floor(),
        "ceil" => arg.ceil(),
        "round" => arg.round(),
        other => bail!("Unknown function '{}'", other),
    };
    Ok(value)
}
