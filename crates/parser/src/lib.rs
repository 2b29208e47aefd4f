//! Recursive-descent parser over the tokenizer's output, mirroring the
//! grammar in `examples/original_source/src/interpreter/interpreter.cpp`
//! (`Interpreter::select`/`insert`/`remove`/`create*`/`drop`/`execfile`).

mod ast;
mod tokenizer;
#[cfg(test)]
mod tests;

pub use ast::{Command, ColumnDef, Literal, Statement, WherePredicate};
pub use tokenizer::{tokenize, Token, TokenKind};

use common::{DbError, DbResult};
use types::{Comparator, TypeCode};

/// Tokenize `source` and split it into independently-parsed statements, one
/// per `;`-terminated chunk. A malformed statement is isolated to its own
/// `Err` entry rather than aborting the whole program: chunking on
/// [`TokenKind::End`] before parsing each chunk means a bad statement can't
/// swallow the ones after it.
pub fn parse_program(source: &str) -> DbResult<Vec<DbResult<Command>>> {
    let tokens = tokenize(source)?;
    let mut results = Vec::new();
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.kind == TokenKind::End {
            let chunk = &tokens[start..i];
            start = i + 1;
            if chunk.is_empty() {
                continue;
            }
            results.push(parse_chunk(chunk));
        }
    }
    Ok(results)
}

/// Find the first complete (`;`-terminated) statement at the front of
/// `buffer`, returning `(consumed_text, remainder)`. Used by the REPL to
/// know when it has read enough lines to parse and execute one statement,
/// and to carry any trailing partial statement into the next prompt.
pub fn split_first_statement(buffer: &str) -> DbResult<Option<(String, String)>> {
    let tokens = tokenize(buffer)?;
    let Some(end) = tokens.iter().find(|t| t.kind == TokenKind::End) else {
        return Ok(None);
    };
    let cut = end.start + 1;
    Ok(Some((buffer[..cut].to_string(), buffer[cut..].to_string())))
}

fn parse_chunk(tokens: &[Token]) -> DbResult<Command> {
    let mut parser = Parser { tokens, pos: 0 };
    let command = parser.parse_command()?;
    parser.expect_exhausted()?;
    Ok(command)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> DbResult<&'a Token> {
        let token = self
            .tokens
            .get(self.pos)
            .ok_or_else(|| DbError::Parse("unexpected end of statement".into()))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect_exhausted(&self) -> DbResult<()> {
        if self.pos != self.tokens.len() {
            let extra = &self.tokens[self.pos];
            return Err(DbError::Parse(format!(
                "unexpected trailing token '{}'",
                extra.text
            )));
        }
        Ok(())
    }

    fn expect_identifier(&mut self, expected: &str) -> DbResult<()> {
        let token = self.advance()?;
        if token.kind != TokenKind::Identifier || token.text != expected {
            return Err(DbError::Parse(format!(
                "expected '{expected}', found '{}'",
                token.text
            )));
        }
        Ok(())
    }

    fn expect_symbol(&mut self, expected: &str) -> DbResult<()> {
        let token = self.advance()?;
        if token.kind != TokenKind::Symbol || token.text != expected {
            return Err(DbError::Parse(format!(
                "expected '{expected}', found '{}'",
                token.text
            )));
        }
        Ok(())
    }

    fn read_name(&mut self) -> DbResult<String> {
        let token = self.advance()?;
        if token.kind != TokenKind::Identifier {
            return Err(DbError::Parse(format!(
                "expected an identifier, found '{}'",
                token.text
            )));
        }
        Ok(token.text.clone())
    }

    fn read_literal(&mut self) -> DbResult<Literal> {
        let token = self.advance()?;
        match token.kind {
            TokenKind::Number => {
                if token.text.contains('.') {
                    token.text.parse::<f32>().map(Literal::Float).map_err(|_| {
                        DbError::Parse(format!("invalid numeric literal '{}'", token.text))
                    })
                } else {
                    token.text.parse::<i32>().map(Literal::Int).map_err(|_| {
                        DbError::Parse(format!("invalid numeric literal '{}'", token.text))
                    })
                }
            }
            TokenKind::StringLiteral => Ok(Literal::Str(token.text.clone())),
            _ => Err(DbError::Parse(format!(
                "expected a value, found '{}'",
                token.text
            ))),
        }
    }

    fn read_comparator(&mut self) -> DbResult<Comparator> {
        let token = self.advance()?;
        if token.kind != TokenKind::Operator {
            return Err(DbError::Parse(format!(
                "expected a comparison operator, found '{}'",
                token.text
            )));
        }
        Comparator::from_str(&token.text)
            .ok_or_else(|| DbError::Parse(format!("unknown operator '{}'", token.text)))
    }

    fn parse_command(&mut self) -> DbResult<Command> {
        let token = self.advance()?;
        if token.kind != TokenKind::Identifier {
            return Err(DbError::Parse(format!(
                "expected a statement keyword, found '{}'",
                token.text
            )));
        }
        match token.text.as_str() {
            "select" => self.parse_select().map(Command::Sql),
            "insert" => self.parse_insert().map(Command::Sql),
            "delete" => self.parse_delete().map(Command::Sql),
            "create" => self.parse_create().map(Command::Sql),
            "drop" => self.parse_drop().map(Command::Sql),
            "execfile" | "exec" => self.parse_execfile(),
            "exit" | "quit" => Ok(Command::Exit),
            other => Err(DbError::Parse(format!("unknown statement '{other}'"))),
        }
    }

    fn parse_where(&mut self) -> DbResult<Vec<WherePredicate>> {
        if self.peek().is_none() {
            return Ok(Vec::new());
        }
        self.expect_identifier("where")?;

        let mut predicates = Vec::new();
        loop {
            let column = self.read_name()?;
            let comparator = self.read_comparator()?;
            let value = self.read_literal()?;
            predicates.push(WherePredicate {
                column,
                comparator,
                value,
            });
            match self.peek() {
                Some(t) if t.kind == TokenKind::Identifier && t.text == "and" => {
                    self.advance()?;
                }
                _ => break,
            }
        }
        Ok(predicates)
    }

    fn parse_select(&mut self) -> DbResult<Statement> {
        self.expect_symbol("*")?;
        self.expect_identifier("from")?;
        let table = self.read_name()?;
        let predicates = self.parse_where()?;
        Ok(Statement::Select { table, predicates })
    }

    fn parse_insert(&mut self) -> DbResult<Statement> {
        self.expect_identifier("into")?;
        let table = self.read_name()?;
        self.expect_identifier("values")?;
        self.expect_symbol("(")?;
        let mut values = Vec::new();
        loop {
            values.push(self.read_literal()?);
            let token = self.advance()?;
            match (token.kind, token.text.as_str()) {
                (TokenKind::Symbol, ")") => break,
                (TokenKind::Symbol, ",") => continue,
                _ => {
                    return Err(DbError::Parse(format!(
                        "expected ',' or ')', found '{}'",
                        token.text
                    )))
                }
            }
        }
        Ok(Statement::Insert { table, values })
    }

    fn parse_delete(&mut self) -> DbResult<Statement> {
        self.expect_identifier("from")?;
        let table = self.read_name()?;
        let predicates = self.parse_where()?;
        Ok(Statement::Delete { table, predicates })
    }

    fn parse_create(&mut self) -> DbResult<Statement> {
        let token = self.advance()?;
        match (token.kind, token.text.as_str()) {
            (TokenKind::Identifier, "table") => self.parse_create_table(),
            (TokenKind::Identifier, "index") => self.parse_create_index(),
            _ => Err(DbError::Parse(format!(
                "expected 'table' or 'index', found '{}'",
                token.text
            ))),
        }
    }

    fn parse_col_type(&mut self) -> DbResult<TypeCode> {
        let name = self.read_name()?;
        match name.as_str() {
            "int" => Ok(TypeCode::Int),
            "float" => Ok(TypeCode::Float),
            "char" => {
                self.expect_symbol("(")?;
                let len_token = self.advance()?;
                if len_token.kind != TokenKind::Number {
                    return Err(DbError::Parse("expected a CHAR length".into()));
                }
                let len: i64 = len_token
                    .text
                    .parse()
                    .map_err(|_| DbError::Parse(format!("invalid CHAR length '{}'", len_token.text)))?;
                if !(1..=255).contains(&len) {
                    return Err(DbError::Parse(format!("CHAR length {len} out of range 1..=255")));
                }
                self.expect_symbol(")")?;
                Ok(TypeCode::Char(len as u8))
            }
            other => Err(DbError::Parse(format!("unknown column type '{other}'"))),
        }
    }

    fn parse_create_table(&mut self) -> DbResult<Statement> {
        let name = self.read_name()?;
        self.expect_symbol("(")?;

        let mut columns = Vec::new();
        let mut primary_key: Option<String> = None;

        loop {
            let peeked = self.peek().cloned();
            let is_primary = matches!(&peeked, Some(t) if t.kind == TokenKind::Identifier && t.text == "primary");
            if is_primary {
                self.advance()?;
                self.expect_identifier("key")?;
                let next = self.peek().cloned();
                let name = if matches!(&next, Some(t) if t.kind == TokenKind::Symbol && t.text == "(") {
                    self.advance()?;
                    let n = self.read_name()?;
                    self.expect_symbol(")")?;
                    n
                } else {
                    self.read_name()?
                };
                if primary_key.replace(name).is_some() {
                    return Err(DbError::Parse("multiple PRIMARY KEY definitions".into()));
                }
            } else {
                let col_name = self.read_name()?;
                let type_code = self.parse_col_type()?;
                let unique = matches!(self.peek(), Some(t) if t.kind == TokenKind::Identifier && t.text == "unique");
                if unique {
                    self.advance()?;
                }
                columns.push(ColumnDef {
                    name: col_name,
                    type_code,
                    unique,
                });
            }

            let token = self.advance()?;
            match (token.kind, token.text.as_str()) {
                (TokenKind::Symbol, ")") => break,
                (TokenKind::Symbol, ",") => continue,
                _ => {
                    return Err(DbError::Parse(format!(
                        "expected ',' or ')', found '{}'",
                        token.text
                    )))
                }
            }
        }

        let primary_key = primary_key
            .ok_or_else(|| DbError::Parse("CREATE TABLE requires a PRIMARY KEY definition".into()))?;

        Ok(Statement::CreateTable {
            name,
            columns,
            primary_key,
        })
    }

    fn parse_create_index(&mut self) -> DbResult<Statement> {
        let name = self.read_name()?;
        self.expect_identifier("on")?;
        let table = self.read_name()?;
        self.expect_symbol("(")?;
        let column = self.read_name()?;
        self.expect_symbol(")")?;
        Ok(Statement::CreateIndex { name, table, column })
    }

    fn parse_drop(&mut self) -> DbResult<Statement> {
        let token = self.advance()?;
        match (token.kind, token.text.as_str()) {
            (TokenKind::Identifier, "table") => {
                let name = self.read_name()?;
                Ok(Statement::DropTable { name })
            }
            (TokenKind::Identifier, "index") => {
                let name = self.read_name()?;
                Ok(Statement::DropIndex { name })
            }
            _ => Err(DbError::Parse(format!(
                "expected 'table' or 'index', found '{}'",
                token.text
            ))),
        }
    }

    fn parse_execfile(&mut self) -> DbResult<Command> {
        let token = self.advance()?;
        if token.kind != TokenKind::StringLiteral {
            return Err(DbError::Parse("expected a quoted file path".into()));
        }
        Ok(Command::ExecFile(token.text.clone()))
    }
}
