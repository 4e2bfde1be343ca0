//! Tokenizer and recursive-descent evaluator for CSS math functions.
//!
//! Grammar:
//!
//! ```text
//! expression := term (('+' | '-') term)*
//! term       := factor (('*' | '/') factor)*
//! factor     := ('+' | '-')* operand
//! operand    := '(' expression ')'
//!             | fn '(' expression (',' expression)* ')'
//!             | var
//!             | number unit?
//! ```
//!
//! Every operand is converted to pixels as soon as it is read, so the
//! arithmetic itself is unit-free.

use super::{numeric_prefix_len, Evaluator, MAX_RESOLVE_DEPTH};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64, String),
    Op(char),
    LParen,
    RParen,
    Comma,
    /// Function name; the opening parenthesis is part of the token.
    Function(String),
    /// A complete `var(...)` reference.
    Var(String),
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let bytes = input.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\n' | b'\r' => i += 1,
            b'+' | b'-' | b'*' | b'/' => {
                tokens.push(Token::Op(c as char));
                i += 1;
            }
            b'(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            b')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            b',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            b'0'..=b'9' | b'.' => {
                let len = numeric_prefix_len(&input[i..]);
                if len == 0 {
                    return None;
                }
                let number: f64 = input[i..i + len].parse().ok()?;
                i += len;
                let unit_start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphabetic() || bytes[i] == b'%') {
                    i += 1;
                }
                tokens.push(Token::Number(
                    number,
                    input[unit_start..i].to_ascii_lowercase(),
                ));
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'-') {
                    i += 1;
                }
                let name = input[start..i].to_ascii_lowercase();
                if i >= bytes.len() || bytes[i] != b'(' {
                    return None;
                }
                if name == "var" {
                    let close = matching_paren(input, i)?;
                    tokens.push(Token::Var(input[start..=close].to_string()));
                    i = close + 1;
                } else {
                    tokens.push(Token::Function(name));
                    i += 1;
                }
            }
            _ => return None,
        }
    }

    Some(tokens)
}

/// Byte offset of the parenthesis closing the one at `open`.
pub(super) fn matching_paren(input: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, c) in input[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

struct Parser<'t, 'e, 'a> {
    tokens: &'t [Token],
    pos: usize,
    evaluator: &'e mut Evaluator<'a>,
    depth: usize,
}

impl Parser<'_, '_, '_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: &Token) -> Option<()> {
        (self.next()? == *expected).then_some(())
    }

    fn expression(&mut self) -> Option<f64> {
        self.depth += 1;
        if self.depth > MAX_RESOLVE_DEPTH {
            return None;
        }
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        self.depth -= 1;
        Some(value)
    }

    fn term(&mut self) -> Option<f64> {
        let mut value = self.factor()?;
        while let Some(Token::Op(op @ ('*' | '/'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.factor()?;
            if op == '*' {
                value *= rhs;
            } else {
                if rhs == 0.0 {
                    return None;
                }
                value /= rhs;
            }
        }
        Some(value)
    }

    fn factor(&mut self) -> Option<f64> {
        // Unary signs are folded here rather than by recursion.
        let mut negate = false;
        while let Some(Token::Op(sign @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            negate ^= sign == '-';
        }
        let value = self.operand()?;
        Some(if negate { -value } else { value })
    }

    fn operand(&mut self) -> Option<f64> {
        match self.next()? {
            Token::LParen => {
                let value = self.expression()?;
                self.expect(&Token::RParen)?;
                Some(value)
            }
            Token::Function(name) => {
                let mut args = vec![self.expression()?];
                while self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                    args.push(self.expression()?);
                }
                self.expect(&Token::RParen)?;
                apply_function(&name, &args)
            }
            Token::Number(value, unit) => Some(self.evaluator.convert(value, &unit)),
            Token::Var(text) => Some(self.evaluator.resolve(&text)),
            _ => None,
        }
    }
}

fn apply_function(name: &str, args: &[f64]) -> Option<f64> {
    match name {
        "calc" if args.len() == 1 => Some(args[0]),
        "min" => args.iter().copied().reduce(f64::min),
        "max" => args.iter().copied().reduce(f64::max),
        // An inverted range (min > max) yields min.
        "clamp" if args.len() == 3 => Some(args[0].max(args[1].min(args[2]))),
        _ => None,
    }
}

/// Evaluate a math expression; `None` when it is malformed.
pub(super) fn evaluate(evaluator: &mut Evaluator, expr: &str) -> Option<f64> {
    let tokens = tokenize(expr)?;
    if tokens.is_empty() {
        return None;
    }
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        evaluator,
        depth: 0,
    };
    let value = parser.expression()?;
    (parser.pos == tokens.len() && value.is_finite()).then_some(value)
}
