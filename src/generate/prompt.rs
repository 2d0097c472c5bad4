use querymind_sqlparse::query::count_statements;

use crate::error::CollaboratorError;

pub const SYSTEM_PROMPT: &str = "You are an expert SQL assistant. Convert natural language queries \
to optimized, syntactically correct SQL for the provided relational schema. Schema format: TABLE \
(column TYPE [annotations]) where annotations can indicate PK primary keys and FK foreign key \
relationships. When multiple tables are referenced, infer JOINs using foreign key relationships. \
Prefer explicit JOIN syntax. Return ONLY the SQL query (single statement) ending with a \
semicolon. Do not include backticks, markdown, or explanations.";

const CONSTRAINTS: &str = "Constraints: Only one SQL statement; choose only relevant columns; \
include necessary JOINs and filters; use table aliases; if aggregation requested include GROUP \
BY; if counting return COUNT with meaningful alias.";

#[must_use]
pub fn user_prompt(text: &str, schema_text: &str) -> String {
    format!("Database Schema:\n{schema_text}\n\nUser Request: {text}\n\n{CONSTRAINTS}")
}

/// Strip markdown code fences, trim and terminate with `;`.
///
/// Output that is empty, that holds more than one statement, or that cannot be tokenized as SQL
/// is malformed. A single statement the parser does not understand is passed through; the store
/// has the final word on it.
pub fn normalize_sql(raw: &str) -> Result<String, CollaboratorError> {
    let mut sql = raw.replace("```sql", "").replace("```", "").trim().to_string();

    if sql.trim_end_matches(';').trim().is_empty() {
        return Err(CollaboratorError::Empty);
    }

    if !sql.ends_with(';') {
        sql.push(';');
    }

    match count_statements(&sql) {
        Ok(n) if n > 1 => Err(CollaboratorError::Malformed(format!(
            "expected a single statement, got {n}"
        ))),
        Ok(_) => Ok(sql),
        Err(e) => Err(CollaboratorError::Malformed(e.to_string())),
    }
}
