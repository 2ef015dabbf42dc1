use sqlx::SqlitePool;

pub const SQLITE_SCHEMA_SQL: &str = include_str!("../../sql/sqlite_schema.sql");

pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut in_line_comment = false;

    for ch in sql.chars() {
        if in_line_comment {
            if ch == '\n' {
                in_line_comment = false;
                current.push(ch);
            }
            continue;
        }

        match ch {
            '-' if !in_single_quote && !in_double_quote && current.ends_with('-') => {
                current.pop();
                in_line_comment = true;
                continue;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
            }
            ';' if !in_single_quote && !in_double_quote => {
                let stmt = current.trim();
                if !stmt.is_empty() {
                    statements.push(stmt.to_string());
                }
                current.clear();
                continue;
            }
            _ => {}
        }

        current.push(ch);
    }

    let tail = current.trim();
    if !tail.is_empty() {
        statements.push(tail.to_string());
    }

    statements
}

pub async fn apply_schema(pool: &SqlitePool) -> Result<usize, sqlx::Error> {
    let statements = split_sql_statements(SQLITE_SCHEMA_SQL);
    let mut tx = pool.begin().await?;
    for stmt in &statements {
        sqlx::query(stmt).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(statements.len())
}
