//! Algebraic conversion formulas (ASAM MCD-2 MC syntax subset).
//!
//! Supports `+ - * / ^ **`, parentheses, unary minus, numeric literals with
//! exponents, the variable `X` (also `X1` and lower case) and the functions
//! `abs sqrt exp ln log log10 sin cos tan asin acos atan sinh cosh tanh`.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Variable,
    Function(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

fn formula_error(formula: &str, what: &str) -> Error {
    Error::FormulaError(format!("{what} in '{formula}'"))
}

fn tokenize(expr: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '+' => {
                tokens.push(Token::Plus);
                chars.next();
            }
            '-' => {
                tokens.push(Token::Minus);
                chars.next();
            }
            '*' => {
                chars.next();
                if chars.peek() == Some(&'*') {
                    chars.next();
                    tokens.push(Token::Caret);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '/' => {
                tokens.push(Token::Slash);
                chars.next();
            }
            '^' => {
                tokens.push(Token::Caret);
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut number = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_digit() || ch == '.' {
                        number.push(ch);
                        chars.next();
                    } else if ch == 'e' || ch == 'E' {
                        number.push(ch);
                        chars.next();
                        if let Some(&(sign @ ('+' | '-'))) = chars.peek() {
                            number.push(sign);
                            chars.next();
                        }
                    } else {
                        break;
                    }
                }
                let value = number
                    .parse()
                    .map_err(|_| formula_error(expr, "invalid number"))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        ident.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let lower = ident.to_ascii_lowercase();
                if lower == "x" || (lower.starts_with('x') && lower[1..].chars().all(|d| d.is_ascii_digit())) {
                    tokens.push(Token::Variable);
                } else {
                    tokens.push(Token::Function(lower));
                }
            }
            other => {
                return Err(formula_error(expr, &format!("unexpected character '{other}'")));
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    formula: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    x: f64,
}

// expr    = term (('+' | '-') term)*
// term    = power (('*' | '/') power)*
// power   = unary ('^' power)?
// unary   = '-' unary | primary
// primary = NUMBER | X | FUNCTION '(' expr ')' | '(' expr ')'
impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn expr(&mut self) -> Result<f64> {
        let mut left = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    left += self.term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    left -= self.term()?;
                }
                _ => return Ok(left),
            }
        }
    }

    fn term(&mut self) -> Result<f64> {
        let mut left = self.power()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    left *= self.power()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let right = self.power()?;
                    if right == 0.0 {
                        return Err(formula_error(self.formula, "division by zero"));
                    }
                    left /= right;
                }
                _ => return Ok(left),
            }
        }
    }

    fn power(&mut self) -> Result<f64> {
        let base = self.unary()?;
        if self.peek() == Some(&Token::Caret) {
            self.pos += 1;
            let exponent = self.power()?;
            Ok(base.powf(exponent))
        } else {
            Ok(base)
        }
    }

    fn unary(&mut self) -> Result<f64> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.primary(),
        }
    }

    fn parenthesized(&mut self) -> Result<f64> {
        if self.peek() != Some(&Token::LParen) {
            return Err(formula_error(self.formula, "expected '('"));
        }
        self.pos += 1;
        let value = self.expr()?;
        if self.peek() != Some(&Token::RParen) {
            return Err(formula_error(self.formula, "expected ')'"));
        }
        self.pos += 1;
        Ok(value)
    }

    fn primary(&mut self) -> Result<f64> {
        match self.peek().cloned() {
            Some(Token::Number(n)) => {
                self.pos += 1;
                Ok(n)
            }
            Some(Token::Variable) => {
                self.pos += 1;
                Ok(self.x)
            }
            Some(Token::LParen) => self.parenthesized(),
            Some(Token::Function(name)) => {
                self.pos += 1;
                let arg = self.parenthesized()?;
                apply_function(&name, arg)
                    .ok_or_else(|| formula_error(self.formula, &format!("unknown function '{name}'")))
            }
            Some(_) => Err(formula_error(self.formula, "unexpected token")),
            None => Err(formula_error(self.formula, "unexpected end")),
        }
    }
}

fn apply_function(name: &str, arg: f64) -> Option<f64> {
    let value = match name {
        "abs" => arg.abs(),
        "sqrt" => arg.sqrt(),
        "exp" => arg.exp(),
        "ln" | "log" => arg.ln(),
        "log10" => arg.log10(),
        "sin" => arg.sin(),
        "cos" => arg.cos(),
        "tan" => arg.tan(),
        "asin" | "arcsin" => arg.asin(),
        "acos" | "arccos" => arg.acos(),
        "atan" | "arctan" => arg.atan(),
        "sinh" => arg.sinh(),
        "cosh" => arg.cosh(),
        "tanh" => arg.tanh(),
        _ => return None,
    };
    Some(value)
}

/// Evaluates `formula` for the variable value `x`.
pub fn eval_formula(formula: &str, x: f64) -> Result<f64> {
    if formula.trim().is_empty() {
        return Err(Error::FormulaError("empty formula".to_string()));
    }
    let mut parser = Parser {
        formula,
        tokens: tokenize(formula)?,
        pos: 0,
        x,
    };
    let value = parser.expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(formula_error(formula, "trailing input"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(formula: &str, x: f64) -> f64 {
        eval_formula(formula, x).unwrap()
    }

    #[test]
    fn variables() {
        assert_eq!(eval("X", 5.0), 5.0);
        assert_eq!(eval("x1 + 1", 5.0), 6.0);
    }

    #[test]
    fn precedence_and_power() {
        assert_eq!(eval("2*X + 1", 3.0), 7.0);
        assert_eq!(eval("X^2 + 3*X + 1", 2.0), 11.0);
        assert_eq!(eval("X**2", 3.0), 9.0);
        assert_eq!(eval("2^3^2", 0.0), 512.0);
        assert_eq!(eval("(X + 1) * 2", 3.0), 8.0);
        assert_eq!(eval("-X - 3", 5.0), -8.0);
    }

    #[test]
    fn literals_and_functions() {
        assert_eq!(eval("1.5e-2 * X", 100.0), 1.5);
        assert!((eval("sqrt(X) + abs(-1)", 16.0) - 5.0).abs() < 1e-12);
        assert!((eval("ln(exp(X))", 2.5) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn errors() {
        assert!(matches!(eval_formula("X / 0", 1.0), Err(Error::FormulaError(_))));
        assert!(eval_formula("X +", 1.0).is_err());
        assert!(eval_formula("foo(X)", 1.0).is_err());
        assert!(eval_formula("X )", 1.0).is_err());
        assert!(eval_formula("", 1.0).is_err());
        assert!(eval_formula("X $ 2", 1.0).is_err());
    }
}
