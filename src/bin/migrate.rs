use rusqlite::{Connection, OpenFlags};
use std::env;
use std::fs;
use std::path::Path;

fn main() -> anyhow::Result<()> {
    // Load .env if it exists
    dotenvy::dotenv().ok();

    println!("Starting database migration...");

    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "givebridge.db".to_string());
    let migration_path =
        env::var("MIGRATION_FILE").unwrap_or_else(|_| "migrations/init.sql".to_string());

    if !Path::new(&migration_path).exists() {
        println!("Migration file not found at: {}", migration_path);
        return Ok(());
    }

    println!("Opening database at {}...", database_url);
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_URI;
    let conn = Connection::open_with_flags(&database_url, flags)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    let sql_content = fs::read_to_string(&migration_path)?;

    // Statements are plain CREATE TABLE/INDEX IF NOT EXISTS, so re-running
    // against an existing database is a no-op.
    let statements: Vec<&str> = sql_content
        .split(';')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    for sql in statements {
        println!("Executing: {:.50}...", sql);
        match conn.execute(sql, []) {
            Ok(_) => println!("Success."),
            Err(e) => {
                let err_msg = e.to_string();
                if err_msg.contains("already exists") {
                    println!("Skipping (already exists).");
                } else {
                    return Err(anyhow::anyhow!("Migration failed: {}", e));
                }
            }
        }
    }

    println!("Migration complete.");
    Ok(())
}
