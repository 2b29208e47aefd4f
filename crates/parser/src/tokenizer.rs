//! Hand-rolled SQL tokenizer, mirroring the state machine in
//! `examples/original_source/src/interpreter/tokenizer.cpp`.
//!
//! Identifiers are case-folded to lowercase; string literals are not.
//! Numeric literals use a strict interpretation: a single optional leading
//! `+`/`-` and a single `.` per token, not "any run of digits/signs/dots."

use common::{DbError, DbResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    StringLiteral,
    Symbol,
    Operator,
    /// The statement-terminating `;`.
    End,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// Byte offset of the first character of this token in the source.
    pub start: usize,
}

struct Cursor<'a> {
    chars: Vec<char>,
    source: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().collect(),
            source,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn byte_offset(&self) -> usize {
        self.chars[..self.pos].iter().map(|c| c.len_utf8()).sum()
    }
}

/// Tokenize an entire buffer, which may contain zero or more `;`-terminated
/// statements. Each `;` yields one [`TokenKind::End`] token; callers split on
/// those boundaries to isolate statements (see [`crate::parse_program`]).
pub fn tokenize(source: &str) -> DbResult<Vec<Token>> {
    let mut cursor = Cursor::new(source);
    let mut tokens = Vec::new();

    loop {
        skip_whitespace(&mut cursor);
        let Some(c) = cursor.peek() else { break };
        let start = cursor.byte_offset();

        if c == ';' {
            tokens.push(Token {
                kind: TokenKind::End,
                text: ";".to_string(),
                start,
            });
            cursor.pos += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            tokens.push(read_identifier(&mut cursor, start));
        } else if c.is_ascii_digit() || c == '+' || c == '-' || c == '.' {
            tokens.push(read_number(&mut cursor, start)?);
        } else if c == '\'' || c == '"' {
            tokens.push(read_string(&mut cursor, start)?);
        } else if matches!(c, ',' | '(' | ')' | '*') {
            tokens.push(Token {
                kind: TokenKind::Symbol,
                text: c.to_string(),
                start,
            });
            cursor.pos += 1;
        } else if matches!(c, '=' | '<' | '>' | '!') {
            tokens.push(read_operator(&mut cursor, start)?);
        } else {
            return Err(DbError::Parse(format!(
                "unexpected character '{c}' at byte offset {start}"
            )));
        }
    }

    Ok(tokens)
}

fn skip_whitespace(cursor: &mut Cursor) {
    while matches!(cursor.peek(), Some(c) if c.is_whitespace()) {
        cursor.pos += 1;
    }
}

fn read_identifier(cursor: &mut Cursor, start: usize) -> Token {
    let mut text = String::new();
    while let Some(c) = cursor.peek() {
        if c.is_ascii_alphanumeric() || c == '_' {
            text.push(c.to_ascii_lowercase());
            cursor.pos += 1;
        } else {
            break;
        }
    }
    Token {
        kind: TokenKind::Identifier,
        text,
        start,
    }
}

fn read_number(cursor: &mut Cursor, start: usize) -> DbResult<Token> {
    let mut text = String::new();
    let mut seen_dot = false;

    if matches!(cursor.peek(), Some('+') | Some('-')) {
        text.push(cursor.peek().unwrap());
        cursor.pos += 1;
    }

    let mut seen_digit = false;
    while let Some(c) = cursor.peek() {
        if c.is_ascii_digit() {
            text.push(c);
            seen_digit = true;
            cursor.pos += 1;
        } else if c == '.' && !seen_dot {
            text.push(c);
            seen_dot = true;
            cursor.pos += 1;
        } else {
            break;
        }
    }

    if !seen_digit {
        return Err(DbError::Parse(format!(
            "malformed numeric literal '{text}' at byte offset {start}"
        )));
    }

    Ok(Token {
        kind: TokenKind::Number,
        text,
        start,
    })
}

fn read_string(cursor: &mut Cursor, start: usize) -> DbResult<Token> {
    let quote = cursor.peek().unwrap();
    cursor.pos += 1;
    let mut text = String::new();
    loop {
        match cursor.peek() {
            Some(c) if c == quote => {
                cursor.pos += 1;
                break;
            }
            Some('\n') | None => {
                return Err(DbError::Parse(format!(
                    "unterminated string literal starting at byte offset {start}"
                )));
            }
            Some(c) => {
                text.push(c);
                cursor.pos += 1;
            }
        }
    }
    Ok(Token {
        kind: TokenKind::StringLiteral,
        text,
        start,
    })
}

fn read_operator(cursor: &mut Cursor, start: usize) -> DbResult<Token> {
    let first = cursor.peek().unwrap();
    cursor.pos += 1;
    let mut text = first.to_string();
    if first == '<' && matches!(cursor.peek(), Some('=') | Some('>')) {
        text.push(cursor.peek().unwrap());
        cursor.pos += 1;
    } else if first == '>' && cursor.peek() == Some('=') {
        text.push('=');
        cursor.pos += 1;
    } else if first == '!' {
        if cursor.peek() == Some('=') {
            text.push('=');
            cursor.pos += 1;
        } else {
            return Err(DbError::Parse(format!(
                "unexpected character '!' at byte offset {start} (did you mean '!='?)"
            )));
        }
    }
    let _ = cursor.source;
    Ok(Token {
        kind: TokenKind::Operator,
        text,
        start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn tokenizes_simple_select() {
        let tokens = tokenize("SELECT * FROM t WHERE a = 1;").unwrap();
        assert_eq!(
            tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>(),
            vec!["select", "*", "from", "t", "where", "a", "=", "1", ";"]
        );
    }

    #[test]
    fn folds_identifiers_but_not_strings() {
        let tokens = tokenize("INSERT INTO T VALUES ('Mixed');").unwrap();
        assert_eq!(tokens[1].text, "into");
        assert_eq!(tokens[2].text, "t");
        assert_eq!(tokens[4].text, "Mixed");
        assert_eq!(tokens[4].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn negative_number_is_one_token() {
        let tokens = tokenize("a = -5;").unwrap();
        assert_eq!(tokens[2].text, "-5");
        assert_eq!(tokens[2].kind, TokenKind::Number);
    }

    #[test]
    fn plus_inside_number_does_not_merge_two_numbers() {
        // A leading sign starts a number; a bare '+' mid-expression is not
        // part of one already in progress.
        let tokens = tokenize("1 + 2;").unwrap();
        assert_eq!(
            tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>(),
            vec!["1", "+2", ";"]
        );
    }

    #[test]
    fn recognizes_all_comparators() {
        let tokens = tokenize("a<>1;a<=1;a>=1;a!=1;").unwrap();
        let ops: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.text.as_str())
            .collect();
        assert_eq!(ops, vec!["<>", "<=", ">=", "!="]);
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = tokenize("select * from t where a = 'oops").unwrap_err();
        assert!(matches!(err, DbError::Parse(_)));
    }

    #[test]
    fn end_tokens_mark_statement_boundaries() {
        let tokens = tokenize("exit; exit;").unwrap();
        assert_eq!(kinds(&tokens), vec![
            TokenKind::Identifier,
            TokenKind::End,
            TokenKind::Identifier,
            TokenKind::End,
        ]);
    }
}
