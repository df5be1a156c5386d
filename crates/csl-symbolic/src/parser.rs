//! Recursive-descent parser for the expression grammar.
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary (('^' | '**') unary)?
//! primary := number | ident | func '(' expr ')' | '(' expr ')'
//! func    := sin | cos | exp | ln | sqrt
//! ```

use crate::error::{SymbolicError, SymbolicResult};
use crate::expr::{Expr, Func};

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    End,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Num(v) => format!("number {v}"),
            Token::Ident(name) => format!("identifier '{name}'"),
            Token::Plus => "'+'".into(),
            Token::Minus => "'-'".into(),
            Token::Star => "'*'".into(),
            Token::Slash => "'/'".into(),
            Token::Caret => "'^'".into(),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::End => "end of input".into(),
        }
    }
}

fn parse_error(input: &str, position: usize, what: impl Into<String>) -> SymbolicError {
    SymbolicError::Parse {
        input: input.to_string(),
        position,
        what: what.into(),
    }
}

fn tokenize(input: &str) -> SymbolicResult<Vec<(Token, usize)>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let start = i;
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                i += 1;
                continue;
            }
            '+' => tokens.push((Token::Plus, start)),
            '-' => tokens.push((Token::Minus, start)),
            '/' => tokens.push((Token::Slash, start)),
            '^' => tokens.push((Token::Caret, start)),
            '(' => tokens.push((Token::LParen, start)),
            ')' => tokens.push((Token::RParen, start)),
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    i += 1;
                    tokens.push((Token::Caret, start));
                } else {
                    tokens.push((Token::Star, start));
                }
            }
            c if c.is_ascii_digit() || c == '.' => {
                let mut j = i;
                while j < chars.len() && (chars[j].is_ascii_digit() || chars[j] == '.') {
                    j += 1;
                }
                // Optional exponent, only consumed when digits follow.
                if j < chars.len() && (chars[j] == 'e' || chars[j] == 'E') {
                    let mut k = j + 1;
                    if k < chars.len() && (chars[k] == '+' || chars[k] == '-') {
                        k += 1;
                    }
                    if k < chars.len() && chars[k].is_ascii_digit() {
                        while k < chars.len() && chars[k].is_ascii_digit() {
                            k += 1;
                        }
                        j = k;
                    }
                }
                let text: String = chars[i..j].iter().collect();
                let value: f64 = text
                    .parse()
                    .map_err(|_| parse_error(input, start, format!("invalid number '{text}'")))?;
                if !value.is_finite() {
                    return Err(parse_error(input, start, format!("number '{text}' overflows")));
                }
                tokens.push((Token::Num(value), start));
                i = j;
                continue;
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut j = i;
                while j < chars.len() && (chars[j].is_alphanumeric() || chars[j] == '_') {
                    j += 1;
                }
                tokens.push((Token::Ident(chars[i..j].iter().collect()), start));
                i = j;
                continue;
            }
            other => {
                return Err(parse_error(input, start, format!("unexpected character '{other}'")));
            }
        }
        i += 1;
    }

    tokens.push((Token::End, chars.len()));
    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<(Token, usize)>,
    pos: usize,
    symbols: Option<&'a [String]>,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).map_or(&Token::End, |(t, _)| t)
    }

    fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map_or(self.input.chars().count(), |(_, p)| *p)
    }

    fn advance(&mut self) -> Token {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, want: Token) -> SymbolicResult<()> {
        if *self.peek() == want {
            self.advance();
            Ok(())
        } else {
            Err(parse_error(
                self.input,
                self.position(),
                format!("expected {}, found {}", want.describe(), self.peek().describe()),
            ))
        }
    }

    fn expr(&mut self) -> SymbolicResult<Expr> {
        let mut lhs = self.term()?;
        loop {
            match self.peek() {
                Token::Plus => {
                    self.advance();
                    lhs = Expr::add(lhs, self.term()?);
                }
                Token::Minus => {
                    self.advance();
                    lhs = Expr::sub(lhs, self.term()?);
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn term(&mut self) -> SymbolicResult<Expr> {
        let mut lhs = self.unary()?;
        loop {
            match self.peek() {
                Token::Star => {
                    self.advance();
                    lhs = Expr::mul(lhs, self.unary()?);
                }
                Token::Slash => {
                    self.advance();
                    lhs = Expr::div(lhs, self.unary()?);
                }
                _ => return Ok(lhs),
            }
        }
    }

    fn unary(&mut self) -> SymbolicResult<Expr> {
        match self.peek() {
            Token::Minus => {
                self.advance();
                Ok(Expr::neg(self.unary()?))
            }
            Token::Plus => {
                self.advance();
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> SymbolicResult<Expr> {
        let base = self.primary()?;
        if *self.peek() == Token::Caret {
            self.advance();
            let exp = self.unary()?;
            return Ok(Expr::pow(base, exp));
        }
        Ok(base)
    }

    fn primary(&mut self) -> SymbolicResult<Expr> {
        let at = self.position();
        match self.advance() {
            Token::Num(v) => Ok(Expr::num(v)),
            Token::LParen => {
                let inner = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Token::Ident(name) => {
                if *self.peek() == Token::LParen {
                    let func = Func::from_name(&name).ok_or_else(|| {
                        SymbolicError::UnknownFunction {
                            name: name.clone(),
                            position: at,
                        }
                    })?;
                    self.advance();
                    let arg = self.expr()?;
                    self.expect(Token::RParen)?;
                    return Ok(Expr::call(func, arg));
                }
                if Func::from_name(&name).is_some() {
                    return Err(parse_error(
                        self.input,
                        self.position(),
                        format!("expected '(' after function '{name}'"),
                    ));
                }
                if let Some(symbols) = self.symbols {
                    if !symbols.iter().any(|s| *s == name) {
                        return Err(SymbolicError::UnknownSymbol { name, position: at });
                    }
                }
                Ok(Expr::Sym(name))
            }
            other => Err(parse_error(
                self.input,
                at,
                format!("unexpected {}", other.describe()),
            )),
        }
    }
}

fn run(input: &str, symbols: Option<&[String]>) -> SymbolicResult<Expr> {
    let tokens = tokenize(input)?;
    let mut parser = Parser {
        input,
        tokens,
        pos: 0,
        symbols,
    };
    let expr = parser.expr()?;
    if *parser.peek() != Token::End {
        return Err(parse_error(
            input,
            parser.position(),
            format!("unexpected trailing {}", parser.peek().describe()),
        ));
    }
    Ok(expr)
}

/// Parse an expression; any identifier not naming a function is a symbol.
pub fn parse(input: &str) -> SymbolicResult<Expr> {
    run(input, None)
}

/// Parse an expression whose identifiers must all be in `symbols`.
pub fn parse_with_symbols(input: &str, symbols: &[String]) -> SymbolicResult<Expr> {
    run(input, Some(symbols))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn eval(input: &str, x: f64) -> f64 {
        let values = BTreeMap::from([("x".to_string(), x)]);
        parse(input).unwrap().eval(&values).unwrap()
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("1 + 2*3", 0.0), 7.0);
        assert_eq!(eval("8 / 4 / 2", 0.0), 1.0);
        assert_eq!(eval("2^3^2", 0.0), 512.0);
        assert_eq!(eval("2**3", 0.0), 8.0);
        assert_eq!(eval("-x^2", 3.0), -9.0);
        assert_eq!(eval("x^-1", 4.0), 0.25);
        assert_eq!(eval("(1 - x)*(1 + x)", 2.0), -3.0);
        assert_eq!(eval("1.5e1 + .5", 0.0), 15.5);
    }

    #[test]
    fn functions() {
        assert!((eval("sin(x)^2 + cos(x)^2", 0.7) - 1.0).abs() < 1e-15);
        assert_eq!(eval("sqrt(x)", 16.0), 4.0);
        assert!((eval("ln(exp(x))", 1.3) - 1.3).abs() < 1e-15);
    }

    #[test]
    fn errors_carry_positions() {
        assert!(matches!(
            parse("x + * 2"),
            Err(SymbolicError::Parse { position: 4, .. })
        ));
        assert!(matches!(
            parse("(x + 1"),
            Err(SymbolicError::Parse { position: 6, .. })
        ));
        assert!(matches!(
            parse("x 2"),
            Err(SymbolicError::Parse { position: 2, .. })
        ));
        assert!(matches!(parse(""), Err(SymbolicError::Parse { position: 0, .. })));
        assert!(matches!(parse("x $ 1"), Err(SymbolicError::Parse { position: 2, .. })));
        assert_eq!(
            parse("tan(x)"),
            Err(SymbolicError::UnknownFunction {
                name: "tan".into(),
                position: 0
            })
        );
        assert!(matches!(parse("sin + 1"), Err(SymbolicError::Parse { .. })));
    }

    #[test]
    fn unknown_symbol_with_allow_list() {
        let symbols = vec!["x1".to_string(), "x2".to_string()];
        assert!(parse_with_symbols("x1*x2", &symbols).is_ok());
        assert_eq!(
            parse_with_symbols("x1 + y", &symbols),
            Err(SymbolicError::UnknownSymbol {
                name: "y".into(),
                position: 5
            })
        );
    }
}
