//! Bookkeeping tables created during provisioning

/// Table recording whether a job's database finished provisioning
pub const STATUS_TABLE: &str = "_db_status";

/// SQL to (re)create the status table
pub const CREATE_STATUS_TABLE: &str = r#"
DROP TABLE IF EXISTS _db_status;
CREATE TABLE _db_status (
    module TEXT PRIMARY KEY,
    status BOOLEAN NOT NULL
);
"#;

/// Quote a value as a SQL string literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote an identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a possibly schema-qualified name (`results.bus_data`) part by part.
pub fn quote_qualified(name: &str) -> String {
    name.split('.').map(quote_ident).collect::<Vec<_>>().join(".")
}

pub fn insert_status_sql(module: &str) -> String {
    format!(
        "INSERT INTO {} (module, status) VALUES ({}, FALSE)",
        STATUS_TABLE,
        quote_literal(module)
    )
}

pub fn set_status_sql(module: &str, done: bool) -> String {
    format!(
        "UPDATE {} SET status = {} WHERE module = {}",
        STATUS_TABLE,
        if done { "TRUE" } else { "FALSE" },
        quote_literal(module)
    )
}

pub fn select_status_sql(module: &str) -> String {
    format!(
        "SELECT status FROM {} WHERE module = {}",
        STATUS_TABLE,
        quote_literal(module)
    )
}

/// Drop and recreate the side table the snapshot hook writes into.
pub fn diagnostics_table_sql(table: &str, columns: &str) -> String {
    let table = quote_ident(table);
    format!("DROP TABLE IF EXISTS {table};\nCREATE TABLE {table} ({columns});")
}
