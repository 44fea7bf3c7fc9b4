pub const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Logical tables reported by store initialization.
pub const MODEL_TABLES: [&str; 6] = [
    "adaptive_model",
    "training_stats",
    "weight_updates",
    "accuracy_history",
    "user_corrections",
    "training_corpus",
];

/// Splits a script on `;`, ignoring separators inside quotes and `--` line
/// comments. Comments are dropped from the output.
pub fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut in_line_comment = false;
    let mut prev = '\0';
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_line_comment {
            if ch == '\n' {
                in_line_comment = false;
                current.push(ch);
            }
            prev = ch;
            continue;
        }

        match ch {
            '-' if !in_single_quote && !in_double_quote && chars.peek() == Some(&'-') => {
                in_line_comment = true;
                chars.next();
                prev = '-';
                continue;
            }
            '\'' if !in_double_quote && prev != '\\' => {
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
                prev = ch;
                continue;
            }
            _ => {}
        }

        current.push(ch);
        prev = ch;
    }

    let tail = current.trim();
    if !tail.is_empty() {
        statements.push(tail.to_string());
    }

    statements
}

pub fn schema_statements() -> Vec<String> {
    split_sql_statements(SCHEMA_SQL)
}
