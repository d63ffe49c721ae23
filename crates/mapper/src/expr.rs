//! The expression evaluator subset required by §4.3/§9: identifiers
//! (`value` plus previously decoded property names), numeric/string
//! literals, arithmetic, comparison, logical operators, the ternary, and
//! `sqrt`. Anything outside this vocabulary fails to *parse*, which the
//! mapper loader turns into a `mapper_invalid` at load time rather than a
//! tick-time surprise (§9).

use shared::PropertyValue;
use std::collections::HashMap;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ExprError {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("expected {expected}, found {found:?}")]
    Expected { expected: &'static str, found: String },
    #[error("unknown identifier {0:?}")]
    UnknownIdentifier(String),
    #[error("unknown function {0:?}")]
    UnknownFunction(String),
    #[error("trailing input after expression: {0:?}")]
    TrailingInput(String),
    #[error("{0:?} is not a number")]
    NotANumber(String),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    String(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
    Comma,
    Question,
    Colon,
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            chars: src.chars().peekable(),
        }
    }

    fn tokenize(src: &'a str) -> Result<Vec<Token>, ExprError> {
        let mut lexer = Lexer::new(src);
        let mut tokens = Vec::new();
        while let Some(&c) = lexer.chars.peek() {
            match c {
                c if c.is_whitespace() => {
                    lexer.chars.next();
                }
                '(' => {
                    lexer.chars.next();
                    tokens.push(Token::LParen);
                }
                ')' => {
                    lexer.chars.next();
                    tokens.push(Token::RParen);
                }
                ',' => {
                    lexer.chars.next();
                    tokens.push(Token::Comma);
                }
                '?' => {
                    lexer.chars.next();
                    tokens.push(Token::Question);
                }
                ':' => {
                    lexer.chars.next();
                    tokens.push(Token::Colon);
                }
                '+' | '-' | '*' | '/' => {
                    lexer.chars.next();
                    let op: &'static str = match c {
                        '+' => "+",
                        '-' => "-",
                        '*' => "*",
                        '/' => "/",
                        _ => unreachable!(),
                    };
                    tokens.push(Token::Op(op));
                }
                '!' => {
                    lexer.chars.next();
                    if lexer.chars.peek() == Some(&'=') {
                        lexer.chars.next();
                        tokens.push(Token::Op("!="));
                    } else {
                        tokens.push(Token::Op("!"));
                    }
                }
                '=' => {
                    lexer.chars.next();
                    if lexer.chars.peek() == Some(&'=') {
                        lexer.chars.next();
                        tokens.push(Token::Op("=="));
                    } else {
                        return Err(ExprError::UnexpectedChar('='));
                    }
                }
                '<' => {
                    lexer.chars.next();
                    if lexer.chars.peek() == Some(&'=') {
                        lexer.chars.next();
                        tokens.push(Token::Op("<="));
                    } else {
                        tokens.push(Token::Op("<"));
                    }
                }
                '>' => {
                    lexer.chars.next();
                    if lexer.chars.peek() == Some(&'=') {
                        lexer.chars.next();
                        tokens.push(Token::Op(">="));
                    } else {
                        tokens.push(Token::Op(">"));
                    }
                }
                '&' => {
                    lexer.chars.next();
                    if lexer.chars.peek() == Some(&'&') {
                        lexer.chars.next();
                        tokens.push(Token::Op("&&"));
                    } else {
                        return Err(ExprError::UnexpectedChar('&'));
                    }
                }
                '|' => {
                    lexer.chars.next();
                    if lexer.chars.peek() == Some(&'|') {
                        lexer.chars.next();
                        tokens.push(Token::Op("||"));
                    } else {
                        return Err(ExprError::UnexpectedChar('|'));
                    }
                }
                '"' | '\'' => {
                    let quote = c;
                    lexer.chars.next();
                    let mut s = String::new();
                    loop {
                        match lexer.chars.next() {
                            Some(ch) if ch == quote => break,
                            Some(ch) => s.push(ch),
                            None => return Err(ExprError::UnexpectedEnd),
                        }
                    }
                    tokens.push(Token::String(s));
                }
                c if c.is_ascii_digit() || c == '.' => {
                    let mut s = String::new();
                    while let Some(&d) = lexer.chars.peek() {
                        if d.is_ascii_digit() || d == '.' {
                            s.push(d);
                            lexer.chars.next();
                        } else {
                            break;
                        }
                    }
                    let value = s
                        .parse::<f64>()
                        .map_err(|_| ExprError::NotANumber(s.clone()))?;
                    tokens.push(Token::Number(value));
                }
                c if c.is_alphabetic() || c == '_' => {
                    let mut s = String::new();
                    while let Some(&d) = lexer.chars.peek() {
                        if d.is_alphanumeric() || d == '_' {
                            s.push(d);
                            lexer.chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push(Token::Ident(s));
                }
                other => return Err(ExprError::UnexpectedChar(other)),
            }
        }
        Ok(tokens)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    String(String),
    Ident(String),
    Unary(&'static str, Box<Expr>),
    Binary(&'static str, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn expect(&mut self, expected: &'static str, tok: Token) -> Result<(), ExprError> {
        match self.next() {
            Some(t) if t == tok => Ok(()),
            Some(other) => Err(ExprError::Expected {
                expected,
                found: format!("{other:?}"),
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }

    fn parse_ternary(&mut self) -> Result<Expr, ExprError> {
        let cond = self.parse_or()?;
        if matches!(self.peek(), Some(Token::Question)) {
            self.next();
            let then_branch = self.parse_ternary()?;
            self.expect("':'", Token::Colon)?;
            let else_branch = self.parse_ternary()?;
            Ok(Expr::Ternary(
                Box::new(cond),
                Box::new(then_branch),
                Box::new(else_branch),
            ))
        } else {
            Ok(cond)
        }
    }

    fn parse_or(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Op("||"))) {
            self.next();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary("||", Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_equality()?;
        while matches!(self.peek(), Some(Token::Op("&&"))) {
            self.next();
            let rhs = self.parse_equality()?;
            lhs = Expr::Binary("&&", Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_relational()?;
        while let Some(Token::Op(op @ ("==" | "!="))) = self.peek().cloned() {
            self.next();
            let rhs = self.parse_relational()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_relational(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_additive()?;
        while let Some(Token::Op(op @ ("<" | "<=" | ">" | ">="))) = self.peek().cloned() {
            self.next();
            let rhs = self.parse_additive()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_multiplicative()?;
        while let Some(Token::Op(op @ ("+" | "-"))) = self.peek().cloned() {
            self.next();
            let rhs = self.parse_multiplicative()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        while let Some(Token::Op(op @ ("*" | "/"))) = self.peek().cloned() {
            self.next();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        match self.peek() {
            Some(Token::Op("!")) => {
                self.next();
                Ok(Expr::Unary("!", Box::new(self.parse_unary()?)))
            }
            Some(Token::Op("-")) => {
                self.next();
                Ok(Expr::Unary("-", Box::new(self.parse_unary()?)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::String(s)) => Ok(Expr::String(s)),
            Some(Token::Ident(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) {
                    self.next();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Some(Token::RParen)) {
                        args.push(self.parse_ternary()?);
                        while matches!(self.peek(), Some(Token::Comma)) {
                            self.next();
                            args.push(self.parse_ternary()?);
                        }
                    }
                    self.expect("')'", Token::RParen)?;
                    Ok(Expr::Call(name, args))
                } else {
                    Ok(Expr::Ident(name))
                }
            }
            Some(Token::LParen) => {
                let inner = self.parse_ternary()?;
                self.expect("')'", Token::RParen)?;
                Ok(inner)
            }
            Some(other) => Err(ExprError::Expected {
                expected: "an expression",
                found: format!("{other:?}"),
            }),
            None => Err(ExprError::UnexpectedEnd),
        }
    }
}

/// Parses `src` into an AST, failing on anything outside the required
/// vocabulary (§4.3, §9). Parsing (not evaluating) is what the mapper
/// loader calls, so an unsupported construct is caught at load time.
pub fn parse(src: &str) -> Result<Expr, ExprError> {
    let tokens = Lexer::tokenize(src)?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_ternary()?;
    if parser.pos != parser.tokens.len() {
        let rest: Vec<String> = parser.tokens[parser.pos..]
            .iter()
            .map(|t| format!("{t:?}"))
            .collect();
        return Err(ExprError::TrailingInput(rest.join(" ")));
    }
    Ok(expr)
}

fn truthy(value: &PropertyValue) -> bool {
    match value {
        PropertyValue::Bool(b) => *b,
        PropertyValue::Integer(i) => *i != 0,
        PropertyValue::Float(f) => *f != 0.0,
        PropertyValue::Text(s) => !s.is_empty(),
    }
}

fn as_number(value: &PropertyValue) -> Result<f64, ExprError> {
    value
        .as_f64()
        .ok_or_else(|| ExprError::NotANumber(value.to_string()))
}

/// Evaluates `expr` against `context` (previously decoded properties) and
/// `current_value` (bound as the identifier `value`, per §4.3).
pub fn eval(
    expr: &Expr,
    context: &HashMap<String, PropertyValue>,
    current_value: Option<&PropertyValue>,
) -> Result<PropertyValue, ExprError> {
    match expr {
        Expr::Number(n) => Ok(PropertyValue::Float(*n)),
        Expr::String(s) => Ok(PropertyValue::Text(s.clone())),
        Expr::Ident(name) => {
            if name == "value" {
                current_value
                    .cloned()
                    .ok_or_else(|| ExprError::UnknownIdentifier(name.clone()))
            } else {
                context
                    .get(name)
                    .cloned()
                    .ok_or_else(|| ExprError::UnknownIdentifier(name.clone()))
            }
        }
        Expr::Unary("!", inner) => {
            Ok(PropertyValue::Bool(!truthy(&eval(inner, context, current_value)?)))
        }
        Expr::Unary("-", inner) => {
            Ok(PropertyValue::Float(-as_number(&eval(inner, context, current_value)?)?))
        }
        Expr::Unary(op, _) => unreachable!("unknown unary operator {op}"),
        Expr::Binary(op @ ("&&" | "||"), lhs, rhs) => {
            let l = truthy(&eval(lhs, context, current_value)?);
            let result = match *op {
                "&&" => l && truthy(&eval(rhs, context, current_value)?),
                "||" => l || truthy(&eval(rhs, context, current_value)?),
                _ => unreachable!(),
            };
            Ok(PropertyValue::Bool(result))
        }
        Expr::Binary(op @ ("==" | "!="), lhs, rhs) => {
            let l = eval(lhs, context, current_value)?;
            let r = eval(rhs, context, current_value)?;
            let equal = values_equal(&l, &r);
            Ok(PropertyValue::Bool(if *op == "==" { equal } else { !equal }))
        }
        Expr::Binary(op @ ("<" | "<=" | ">" | ">="), lhs, rhs) => {
            let l = as_number(&eval(lhs, context, current_value)?)?;
            let r = as_number(&eval(rhs, context, current_value)?)?;
            let result = match *op {
                "<" => l < r,
                "<=" => l <= r,
                ">" => l > r,
                ">=" => l >= r,
                _ => unreachable!(),
            };
            Ok(PropertyValue::Bool(result))
        }
        Expr::Binary(op @ ("+" | "-" | "*" | "/"), lhs, rhs) => {
            let l = eval(lhs, context, current_value)?;
            let r = eval(rhs, context, current_value)?;
            if *op == "+" {
                if let (PropertyValue::Text(a), PropertyValue::Text(b)) = (&l, &r) {
                    return Ok(PropertyValue::Text(format!("{a}{b}")));
                }
            }
            let a = as_number(&l)?;
            let b = as_number(&r)?;
            let result = match *op {
                "+" => a + b,
                "-" => a - b,
                "*" => a * b,
                "/" => a / b,
                _ => unreachable!(),
            };
            Ok(PropertyValue::Float(result))
        }
        Expr::Binary(op, _, _) => unreachable!("unknown binary operator {op}"),
        Expr::Ternary(cond, then_branch, else_branch) => {
            if truthy(&eval(cond, context, current_value)?) {
                eval(then_branch, context, current_value)
            } else {
                eval(else_branch, context, current_value)
            }
        }
        Expr::Call(name, args) => {
            if name == "sqrt" && args.len() == 1 {
                let arg = as_number(&eval(&args[0], context, current_value)?)?;
                Ok(PropertyValue::Float(arg.sqrt()))
            } else {
                Err(ExprError::UnknownFunction(name.clone()))
            }
        }
    }
}

fn values_equal(a: &PropertyValue, b: &PropertyValue) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a.as_str() == b.as_str(),
    }
}

/// Validates that `src` parses under the required vocabulary without
/// evaluating it, for use at mapper load time (§9).
pub fn validate_syntax(src: &str) -> Result<(), ExprError> {
    parse(src).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> HashMap<String, PropertyValue> {
        let mut m = HashMap::new();
        m.insert("hp".to_string(), PropertyValue::Float(120.0));
        m.insert("maxHp".to_string(), PropertyValue::Float(140.0));
        m
    }

    #[test]
    fn evaluates_arithmetic_with_property_identifiers() {
        let expr = parse("hp / maxHp * 100").unwrap();
        let result = eval(&expr, &ctx(), None).unwrap();
        let value = result.as_f64().unwrap();
        assert!((value - 85.714).abs() < 0.01, "got {value}");
    }

    #[test]
    fn evaluates_ternary_and_comparison() {
        let expr = parse("value > 10 ? \"high\" : \"low\"").unwrap();
        let result = eval(&expr, &ctx(), Some(&PropertyValue::Integer(20))).unwrap();
        assert_eq!(result, PropertyValue::Text("high".to_string()));
    }

    #[test]
    fn evaluates_sqrt() {
        let expr = parse("sqrt(value)").unwrap();
        let result = eval(&expr, &ctx(), Some(&PropertyValue::Integer(16))).unwrap();
        assert_eq!(result.as_f64(), Some(4.0));
    }

    #[test]
    fn evaluates_logical_operators() {
        let expr = parse("value > 0 && value < 100").unwrap();
        let result = eval(&expr, &ctx(), Some(&PropertyValue::Integer(50))).unwrap();
        assert_eq!(result, PropertyValue::Bool(true));
    }

    #[test]
    fn rejects_constructs_outside_the_vocabulary_at_parse_time() {
        assert!(parse("value.toString()").is_err());
        assert!(parse("for (;;) {}").is_err());
    }

    #[test]
    fn string_concatenation_via_plus() {
        let expr = parse("\"RO\" + \"NO\"").unwrap();
        let result = eval(&expr, &ctx(), None).unwrap();
        assert_eq!(result, PropertyValue::Text("RONO".to_string()));
    }
}
