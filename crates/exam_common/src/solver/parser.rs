//! Recursive-descent parser from equation text to polynomials
//!
//! ```text
//! equation := expr [ "=" expr ] EOF
//! expr     := term (("+" | "-") term)*
//! term     := unary (("*" | "/") unary | power)*     ; juxtaposition multiplies
//! unary    := ("+" | "-") unary | power
//! power    := primary [ "^" unary ]
//! primary  := NUMBER | VARIABLE | "(" expr ")"
//! ```

use super::polynomial::{Polynomial, MAX_DEGREE};
use super::SolveError;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Var(char),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    Eq,
}

fn tokenize(src: &str) -> Result<Vec<Token>, SolveError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let token = match c {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                let value = literal
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| SolveError::Syntax(format!("bad number '{}'", literal)))?;
                tokens.push(Token::Num(value));
                continue;
            }
            c if c.is_ascii_alphabetic() => Token::Var(c),
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '=' => Token::Eq,
            other => {
                return Err(SolveError::Syntax(format!("unexpected character '{}'", other)))
            }
        };
        tokens.push(token);
        i += 1;
    }

    Ok(tokens)
}

/// Parsed equation as `lhs - rhs`
pub fn parse_equation(src: &str) -> Result<Polynomial, SolveError> {
    let tokens = tokenize(src)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        variable: None,
    };

    let lhs = parser.expr()?;
    let rhs = if parser.eat(Token::Eq) {
        parser.expr()?
    } else {
        Polynomial::constant(0.0)
    };

    if let Some(tok) = parser.peek() {
        return Err(SolveError::Syntax(format!("unexpected {:?}", tok)));
    }

    Ok(&lhs - &rhs)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    variable: Option<char>,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.peek();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> Result<Polynomial, SolveError> {
        let mut acc = self.term()?;
        loop {
            if self.eat(Token::Plus) {
                acc = &acc + &self.term()?;
            } else if self.eat(Token::Minus) {
                acc = &acc - &self.term()?;
            } else {
                return Ok(acc);
            }
        }
    }

    fn term(&mut self) -> Result<Polynomial, SolveError> {
        let mut acc = self.unary()?;
        loop {
            let rhs = match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    self.unary()?
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let divisor = self.unary()?;
                    let value = divisor.as_constant().ok_or_else(|| {
                        SolveError::Unsupported("division by a non-constant expression".into())
                    })?;
                    if value == 0.0 {
                        return Err(SolveError::Unsupported("division by zero".into()));
                    }
                    Polynomial::constant(1.0 / value)
                }
                Some(Token::Num(_)) | Some(Token::Var(_)) | Some(Token::LParen) => self.power()?,
                _ => return Ok(acc),
            };
            acc = checked_degree(&acc * &rhs)?;
        }
    }

    fn unary(&mut self) -> Result<Polynomial, SolveError> {
        if self.eat(Token::Minus) {
            return Ok(-&self.unary()?);
        }
        if self.eat(Token::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<Polynomial, SolveError> {
        let base = self.primary()?;
        if !self.eat(Token::Caret) {
            return Ok(base);
        }

        let exponent = self.unary()?.as_constant().ok_or_else(|| {
            SolveError::Unsupported("exponent must be a constant".into())
        })?;
        if exponent < 0.0 || exponent.fract() != 0.0 {
            return Err(SolveError::Unsupported(format!(
                "exponent must be a non-negative integer, got {}",
                exponent
            )));
        }
        if base.as_constant().is_none() && exponent > MAX_DEGREE as f64 {
            return Err(too_high(exponent as usize));
        }
        if exponent > 64.0 {
            return Err(SolveError::Unsupported(format!("exponent {} is too large", exponent)));
        }

        checked_degree(base.pow(exponent as u32))
    }

    fn primary(&mut self) -> Result<Polynomial, SolveError> {
        match self.next() {
            Some(Token::Num(value)) => Ok(Polynomial::constant(value)),
            Some(Token::Var(name)) => {
                match self.variable {
                    None => self.variable = Some(name),
                    Some(v) if v == name => {}
                    Some(v) => {
                        return Err(SolveError::Unsupported(format!(
                            "more than one variable ({} and {})",
                            v, name
                        )))
                    }
                }
                Ok(Polynomial::variable())
            }
            Some(Token::LParen) => {
                let inner = self.expr()?;
                if !self.eat(Token::RParen) {
                    return Err(SolveError::Syntax("missing ')'".into()));
                }
                Ok(inner)
            }
            Some(tok) => Err(SolveError::Syntax(format!("unexpected {:?}", tok))),
            None => Err(SolveError::Syntax("unexpected end of expression".into())),
        }
    }
}

fn checked_degree(p: Polynomial) -> Result<Polynomial, SolveError> {
    if p.degree() > MAX_DEGREE {
        return Err(too_high(p.degree()));
    }
    Ok(p)
}

fn too_high(degree: usize) -> SolveError {
    SolveError::Unsupported(format!(
        "degree {} exceeds the maximum of {}",
        degree, MAX_DEGREE
    ))
}
