//! Token classification and tokenizing.
//!
//! Stored expressions are ordered token sequences. Each token is classified,
//! in order, as an operator, a literal, or a reference to a variable or
//! calculation.

use std::fmt;

use crate::value::parse_float;

/// One of the fixed expression operators (parentheses included).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    LParen,
    RParen,
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
    Ne,
    And,
    Or,
}

impl Operator {
    /// Returns the operator spelled by `s`, if any.
    pub fn parse(s: &str) -> Option<Self> {
        let op = match s {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "/" => Self::Div,
            "(" => Self::LParen,
            ")" => Self::RParen,
            ">" => Self::Gt,
            "<" => Self::Lt,
            ">=" => Self::Ge,
            "<=" => Self::Le,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "&&" => Self::And,
            "||" => Self::Or,
            _ => return None,
        };
        Some(op)
    }

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A literal token.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Bool(bool),
    Text(String),
}

/// A classified token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    Operator(Operator),
    Literal(Literal),
    /// A variable or calculation name, resolved later.
    Reference(&'a str),
}

/// Classifies a single token.
pub fn classify(token: &str) -> Token<'_> {
    if let Some(op) = Operator::parse(token) {
        return Token::Operator(op);
    }
    match token {
        "true" => return Token::Literal(Literal::Bool(true)),
        "false" => return Token::Literal(Literal::Bool(false)),
        _ => {}
    }
    if let Some(text) = unquote(token) {
        return Token::Literal(Literal::Text(text.to_string()));
    }
    if looks_numeric(token) {
        if let Some(n) = parse_float(token) {
            return Token::Literal(Literal::Number(n));
        }
    }
    Token::Reference(token)
}

/// Numbers must start with a digit or a dot (optionally signed) so names
/// such as `inf` or `nan` stay references.
fn looks_numeric(token: &str) -> bool {
    let unsigned = token
        .strip_prefix('-')
        .or_else(|| token.strip_prefix('+'))
        .unwrap_or(token);
    unsigned
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit() || c == '.')
}

fn unquote(token: &str) -> Option<&str> {
    let first = token.chars().next()?;
    if token.len() >= 2 && (first == '"' || first == '\'') && token.ends_with(first) {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}

/// Errors raised while splitting a formula string into tokens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenizeError {
    #[error("unterminated string literal starting at offset {0}")]
    UnterminatedString(usize),

    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedChar { ch: char, offset: usize },
}

/// Splits a formula string into tokens.
///
/// Whitespace separates tokens but is not required around operators:
/// `"subtotal*(1+taxRate)"` and `"subtotal * ( 1 + taxRate )"` produce the
/// same sequence. Quoted literals keep their quotes.
pub fn tokenize(src: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(start, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        if c == '"' || c == '\'' {
            chars.next();
            let mut end = None;
            for (i, ch) in chars.by_ref() {
                if ch == c {
                    end = Some(i + ch.len_utf8());
                    break;
                }
            }
            let end = end.ok_or(TokenizeError::UnterminatedString(start))?;
            tokens.push(src[start..end].to_string());
            continue;
        }

        // Two-character operators first.
        if let Some(two) = src.get(start..start + 2) {
            if matches!(two, ">=" | "<=" | "==" | "!=" | "&&" | "||") {
                chars.next();
                chars.next();
                tokens.push(two.to_string());
                continue;
            }
        }

        match c {
            '+' | '-' | '*' | '/' | '(' | ')' | '>' | '<' => {
                chars.next();
                tokens.push(c.to_string());
            }
            '=' | '!' | '&' | '|' => {
                return Err(TokenizeError::UnexpectedChar { ch: c, offset: start });
            }
            _ => {
                let mut end = start;
                while let Some(&(i, ch)) = chars.peek() {
                    let exponent_sign =
                        (ch == '-' || ch == '+') && is_exponent_prefix(&src[start..end]);
                    if !exponent_sign && (ch.is_whitespace() || is_delimiter(ch)) {
                        break;
                    }
                    end = i + ch.len_utf8();
                    chars.next();
                }
                tokens.push(src[start..end].to_string());
            }
        }
    }

    Ok(tokens)
}

/// `1e`, `2.5E`: a number cut off right before its exponent sign.
fn is_exponent_prefix(word: &str) -> bool {
    let Some(mantissa) = word.strip_suffix(['e', 'E']) else {
        return false;
    };
    mantissa.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && mantissa.chars().all(|c| c.is_ascii_digit() || c == '.')
}

fn is_delimiter(c: char) -> bool {
    matches!(
        c,
        '+' | '-' | '*' | '/' | '(' | ')' | '>' | '<' | '=' | '!' | '&' | '|' | '"' | '\''
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classify_in_order() {
        assert_eq!(classify(">="), Token::Operator(Operator::Ge));
        assert_eq!(classify("-"), Token::Operator(Operator::Sub));
        assert_eq!(classify("1.5"), Token::Literal(Literal::Number(1.5)));
        assert_eq!(classify("-2"), Token::Literal(Literal::Number(-2.0)));
        assert_eq!(classify("true"), Token::Literal(Literal::Bool(true)));
        assert_eq!(classify("'gold'"), Token::Literal(Literal::Text("gold".into())));
        assert_eq!(classify("\"a b\""), Token::Literal(Literal::Text("a b".into())));
        assert_eq!(classify("base_price"), Token::Reference("base_price"));
    }

    #[test]
    fn special_float_names_are_references() {
        assert_eq!(classify("inf"), Token::Reference("inf"));
        assert_eq!(classify("NaN"), Token::Reference("NaN"));
        assert_eq!(classify("True"), Token::Reference("True"));
    }

    #[test]
    fn mismatched_quotes_are_references() {
        assert_eq!(classify("'gold\""), Token::Reference("'gold\""));
        assert_eq!(classify("'"), Token::Reference("'"));
    }

    #[test]
    fn exponent_literals() {
        assert_eq!(classify("1e-5"), Token::Literal(Literal::Number(1e-5)));
        assert_eq!(classify("2E+3"), Token::Literal(Literal::Number(2000.0)));
    }

    #[test]
    fn tokenize_mixed_spacing() {
        assert_eq!(
            tokenize("subtotal*(1+taxRate)").unwrap(),
            vec!["subtotal", "*", "(", "1", "+", "taxRate", ")"]
        );
        assert_eq!(
            tokenize("tier == 'gold' && qty >= 10").unwrap(),
            vec!["tier", "==", "'gold'", "&&", "qty", ">=", "10"]
        );
    }

    #[test]
    fn tokenize_keeps_decimals_together() {
        assert_eq!(tokenize("base_price * 1.5").unwrap(), vec!["base_price", "*", "1.5"]);
    }

    #[test]
    fn tokenize_keeps_exponent_signs() {
        assert_eq!(tokenize("x * 1e-5").unwrap(), vec!["x", "*", "1e-5"]);
        assert_eq!(tokenize("2.5E+3-x").unwrap(), vec!["2.5E+3", "-", "x"]);
        assert_eq!(tokenize("rate-1").unwrap(), vec!["rate", "-", "1"]);
        assert_eq!(tokenize("size_e-1").unwrap(), vec!["size_e", "-", "1"]);
    }

    #[test]
    fn tokenize_errors() {
        assert_eq!(
            tokenize("name == 'open").unwrap_err(),
            TokenizeError::UnterminatedString(8)
        );
        assert!(matches!(
            tokenize("a = b"),
            Err(TokenizeError::UnexpectedChar { ch: '=', .. })
        ));
    }
}
