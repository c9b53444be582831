use anyhow::Context;
use rusqlite::Connection;

// Migrations are embedded so in-memory test databases get the full schema.
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_init",
    "CREATE TABLE IF NOT EXISTS businesses (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        opening_time TEXT NOT NULL DEFAULT '09:00',
        closing_time TEXT NOT NULL DEFAULT '18:00'
    );

    CREATE TABLE IF NOT EXISTS business_settings (
        business_id INTEGER PRIMARY KEY REFERENCES businesses(id),
        slot_interval_minutes INTEGER NOT NULL DEFAULT 15,
        min_notice_minutes INTEGER NOT NULL DEFAULT 60,
        booking_window_days INTEGER NOT NULL DEFAULT 30
    );

    CREATE TABLE IF NOT EXISTS services (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        business_id INTEGER NOT NULL REFERENCES businesses(id),
        name TEXT NOT NULL,
        duration_minutes INTEGER NOT NULL,
        price REAL NOT NULL DEFAULT 0
    );

    CREATE TABLE IF NOT EXISTS staff (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        business_id INTEGER NOT NULL REFERENCES businesses(id),
        name TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1
    );

    CREATE TABLE IF NOT EXISTS staff_services (
        staff_id INTEGER NOT NULL REFERENCES staff(id),
        service_id INTEGER NOT NULL REFERENCES services(id),
        PRIMARY KEY (staff_id, service_id)
    );

    CREATE TABLE IF NOT EXISTS appointments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        business_id INTEGER NOT NULL REFERENCES businesses(id),
        service_id INTEGER NOT NULL REFERENCES services(id),
        customer_id INTEGER,
        customer_name TEXT,
        customer_phone TEXT,
        appointment_date TEXT NOT NULL,
        appointment_time TEXT,
        start_time TEXT,
        end_time TEXT,
        staff_id INTEGER REFERENCES staff(id),
        status TEXT NOT NULL DEFAULT 'pending',
        source TEXT NOT NULL DEFAULT 'customer',
        notes TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE INDEX IF NOT EXISTS idx_appointments_lookup
        ON appointments(business_id, appointment_date, staff_id);",
)];

pub fn run_migrations(conn: &Connection) -> anyhow::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );",
    )
    .context("failed to create migrations table")?;

    for (name, sql) in MIGRATIONS {
        let already_applied: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM _migrations WHERE name = ?1",
                [name],
                |row| row.get(0),
            )
            .context("failed to check migration status")?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)
            .with_context(|| format!("failed to apply migration: {name}"))?;

        conn.execute("INSERT INTO _migrations (name) VALUES (?1)", [name])
            .with_context(|| format!("failed to record migration: {name}"))?;

        tracing::info!("applied migration: {name}");
    }

    Ok(())
}
