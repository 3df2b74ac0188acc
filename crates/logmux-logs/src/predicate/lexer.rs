use crate::error::PredicateError;

/// Token kinds of the predicate language
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Dot,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Not,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    And,
    Or,
    Match,
    Eof,
}

impl Token {
    /// Short description for error messages
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("number {}", n),
            Self::Str(s) => format!("string {:?}", s),
            Self::Ident(name) => format!("identifier `{}`", name),
            Self::Eof => "end of expression".to_string(),
            other => format!("`{}`", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            Self::Dot => ".",
            Self::LBracket => "[",
            Self::RBracket => "]",
            Self::LParen => "(",
            Self::RParen => ")",
            Self::Not => "!",
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Percent => "%",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::StrictEq => "===",
            Self::StrictNe => "!==",
            Self::And => "&&",
            Self::Or => "||",
            Self::Match => "=~",
            _ => "?",
        }
    }
}

/// A token and the byte offset it starts at
#[derive(Clone, Debug, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub offset: usize,
}

/// Split an expression into tokens, always ending with `Token::Eof`
pub fn tokenize(src: &str) -> Result<Vec<Spanned>, PredicateError> {
    let mut tokens = Vec::new();
    let bytes = src.as_bytes();
    let mut pos = 0;

    while pos < src.len() {
        let ch = match src[pos..].chars().next() {
            Some(ch) => ch,
            None => break,
        };
        if ch.is_whitespace() {
            pos += ch.len_utf8();
            continue;
        }

        let offset = pos;
        let next = bytes.get(pos + 1).copied();
        let next2 = bytes.get(pos + 2).copied();

        let (token, len) = match ch {
            '.' if !next.is_some_and(|b| b.is_ascii_digit()) => (Token::Dot, 1),
            '[' => (Token::LBracket, 1),
            ']' => (Token::RBracket, 1),
            '(' => (Token::LParen, 1),
            ')' => (Token::RParen, 1),
            '+' => (Token::Plus, 1),
            '-' => (Token::Minus, 1),
            '*' => (Token::Star, 1),
            '/' => (Token::Slash, 1),
            '%' => (Token::Percent, 1),
            '<' if next == Some(b'=') => (Token::Le, 2),
            '<' => (Token::Lt, 1),
            '>' if next == Some(b'=') => (Token::Ge, 2),
            '>' => (Token::Gt, 1),
            '=' if next == Some(b'=') && next2 == Some(b'=') => (Token::StrictEq, 3),
            '=' if next == Some(b'=') => (Token::Eq, 2),
            '=' if next == Some(b'~') => (Token::Match, 2),
            '!' if next == Some(b'=') && next2 == Some(b'=') => (Token::StrictNe, 3),
            '!' if next == Some(b'=') => (Token::Ne, 2),
            '!' => (Token::Not, 1),
            '&' if next == Some(b'&') => (Token::And, 2),
            '|' if next == Some(b'|') => (Token::Or, 2),
            '"' | '\'' => {
                let (text, len) = lex_string(&src[pos..], ch, offset)?;
                (Token::Str(text), len)
            }
            c if c.is_ascii_digit() || c == '.' => {
                let len = src[pos..]
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.'))
                    .unwrap_or(src.len() - pos);
                let text = &src[pos..pos + len];
                let number = text
                    .parse::<f64>()
                    .map_err(|_| PredicateError::InvalidNumber {
                        text: text.to_string(),
                        offset,
                    })?;
                (Token::Number(number), len)
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let len = src[pos..]
                    .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
                    .unwrap_or(src.len() - pos);
                (Token::Ident(src[pos..pos + len].to_string()), len)
            }
            other => return Err(PredicateError::UnexpectedChar { ch: other, offset }),
        };

        tokens.push(Spanned { token, offset });
        pos += len;
    }

    tokens.push(Spanned {
        token: Token::Eof,
        offset: src.len(),
    });
    Ok(tokens)
}

/// Lex a quoted string; returns the unescaped text and the consumed length
fn lex_string(rest: &str, quote: char, offset: usize) -> Result<(String, usize), PredicateError> {
    let mut text = String::new();
    let mut chars = rest.char_indices().skip(1);

    while let Some((i, c)) = chars.next() {
        match c {
            c if c == quote => return Ok((text, i + c.len_utf8())),
            '\\' => {
                let (_, escaped) = chars
                    .next()
                    .ok_or(PredicateError::UnterminatedString { offset })?;
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    '0' => '\0',
                    other => other,
                });
            }
            c => text.push(c),
        }
    }

    Err(PredicateError::UnterminatedString { offset })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Token> {
        tokenize(src).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a === 1 && b !== 'x' || !c"),
            vec![
                Token::Ident("a".into()),
                Token::StrictEq,
                Token::Number(1.0),
                Token::And,
                Token::Ident("b".into()),
                Token::StrictNe,
                Token::Str("x".into()),
                Token::Or,
                Token::Not,
                Token::Ident("c".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_member_access_and_decimal() {
        assert_eq!(
            kinds("this.req.code >= .5"),
            vec![
                Token::Ident("this".into()),
                Token::Dot,
                Token::Ident("req".into()),
                Token::Dot,
                Token::Ident("code".into()),
                Token::Ge,
                Token::Number(0.5),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\"b\n""#),
            vec![Token::Str("a\"b\n".into()), Token::Eof]
        );
    }

    #[test]
    fn test_errors_carry_offset() {
        assert_eq!(
            tokenize("level == 'oops"),
            Err(PredicateError::UnterminatedString { offset: 9 })
        );
        assert_eq!(
            tokenize("a # b"),
            Err(PredicateError::UnexpectedChar { ch: '#', offset: 2 })
        );
        assert!(matches!(
            tokenize("1.2.3"),
            Err(PredicateError::InvalidNumber { .. })
        ));
    }
}
