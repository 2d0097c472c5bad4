use sqlparser::{
    ast::Statement,
    dialect::{GenericDialect, SQLiteDialect},
    parser::{Parser, ParserError},
    tokenizer::{Token, Tokenizer},
};
use thiserror::Error;

use crate::schema::SqlTable;

#[derive(Debug, Error)]
pub enum DdlError {
    #[error("failed to parse table definition: {0}")]
    Parse(#[from] ParserError),
    #[error("definition does not contain a CREATE TABLE statement")]
    NotCreateTable,
}

/// Parse the first `CREATE TABLE` statement found in `query`.
pub fn parse_create_table(query: &str) -> Result<SqlTable, DdlError> {
    let ast = Parser::parse_sql(&SQLiteDialect {}, query)?;

    ast.iter()
        .find_map(|e| {
            if let Statement::CreateTable(statement) = e {
                Some(statement)
            } else {
                None
            }
        })
        .map(SqlTable::from)
        .ok_or(DdlError::NotCreateTable)
}

/// Number of statements in `sql`, using a dialect-agnostic parser.
///
/// Text the parser rejects is counted on its token stream instead: every `;`-separated run that
/// holds more than whitespace and comments is one statement. Only text that cannot even be
/// tokenized is an error.
pub fn count_statements(sql: &str) -> Result<usize, ParserError> {
    let dialect = GenericDialect {};

    if let Ok(statements) = Parser::parse_sql(&dialect, sql) {
        return Ok(statements.len());
    }

    let tokens = Tokenizer::new(&dialect, sql).tokenize()?;

    Ok(tokens
        .split(|e| matches!(e, Token::SemiColon))
        .filter(|e| {
            e.iter()
                .any(|e| !matches!(e, Token::Whitespace(_) | Token::EOF))
        })
        .count())
}
