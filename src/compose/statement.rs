//! A minimal `SELECT` builder for the statements the heuristic composer emits.

use std::fmt::Display;

use sqlx::{Any, QueryBuilder};

use crate::schema::quote_identifier;

/// This trait represents anything that can be pushed into a [`QueryBuilder`], i.e. any kind of
/// statement fragment, like a projection or a join condition.
pub trait PushToQuery {
    /// Push the object's contents into a query builder.
    fn push_to(&self, builder: &mut QueryBuilder<'_, Any>);
}

/// An optionally table-qualified column reference, quoted only where needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnName {
    table: Option<String>,
    column: String,
}

impl ColumnName {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    pub fn new_with_table(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }
}

impl Display for ColumnName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(table) = &self.table {
            write!(f, "{}.", quote_identifier(table))?;
        }
        write!(f, "{}", quote_identifier(&self.column))
    }
}

impl PushToQuery for ColumnName {
    fn push_to(&self, builder: &mut QueryBuilder<'_, Any>) {
        builder.push(self);
    }
}

/// `left = right`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equals {
    left: ColumnName,
    right: ColumnName,
}

impl Equals {
    pub const fn new(left: ColumnName, right: ColumnName) -> Self {
        Self { left, right }
    }
}

impl PushToQuery for Equals {
    fn push_to(&self, builder: &mut QueryBuilder<'_, Any>) {
        self.left.push_to(builder);
        builder.push(" = ");
        self.right.push_to(builder);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `*`
    Everything,
    /// `a.*, b.*`
    AllOf(Vec<String>),
    /// `COUNT(*)`, optionally aliased.
    Count { alias: Option<String> },
}

impl PushToQuery for Projection {
    fn push_to(&self, builder: &mut QueryBuilder<'_, Any>) {
        match self {
            Self::Everything => {
                builder.push("*");
            }
            Self::AllOf(tables) => {
                tables.iter().enumerate().for_each(|(i, e)| {
                    if i > 0 {
                        builder.push(", ");
                    }
                    builder.push(format_args!("{}.*", quote_identifier(e)));
                });
            }
            Self::Count { alias } => {
                builder.push("COUNT(*)");
                if let Some(alias) = alias {
                    builder.push(format_args!(" AS {alias}"));
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Join {
    table: String,
    on: Equals,
}

/// `SELECT <projection> FROM <table> [JOIN <table> ON <condition>];`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Select {
    projection: Projection,
    from: String,
    join: Option<Join>,
}

impl Select {
    pub fn new(projection: Projection, from: impl Into<String>) -> Self {
        Self {
            projection,
            from: from.into(),
            join: None,
        }
    }

    /// Inner-join `table` on `on`.
    #[must_use]
    pub fn join(mut self, table: impl Into<String>, on: Equals) -> Self {
        self.join = Some(Join {
            table: table.into(),
            on,
        });
        self
    }

    /// The statement's SQL, terminated by `;`.
    #[must_use]
    pub fn query(&self) -> String {
        let mut builder = QueryBuilder::new("");
        self.push_to(&mut builder);
        builder.push(";");
        builder.into_sql()
    }
}

impl PushToQuery for Select {
    fn push_to(&self, builder: &mut QueryBuilder<'_, Any>) {
        builder.push("SELECT ");
        self.projection.push_to(builder);
        builder.push(format_args!(" FROM {}", quote_identifier(&self.from)));

        if let Some(join) = &self.join {
            builder.push(format_args!(" JOIN {} ON ", quote_identifier(&join.table)));
            join.on.push_to(builder);
        }
    }
}
