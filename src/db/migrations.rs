use anyhow::Context;
use rusqlite::Connection;

// Schema migrations are compiled in so the binary and the test suite never
// depend on the working directory.
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_init",
    "CREATE TABLE users (
        id TEXT PRIMARY KEY,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        phone TEXT,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'client',
        api_token TEXT UNIQUE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE services (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        price REAL NOT NULL,
        duration_minutes INTEGER NOT NULL,
        category TEXT NOT NULL,
        service_type TEXT NOT NULL,
        max_participants INTEGER NOT NULL DEFAULT 10,
        is_active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE TABLE bookings (
        id TEXT PRIMARY KEY,
        client_id TEXT NOT NULL REFERENCES users(id),
        service_id TEXT NOT NULL REFERENCES services(id),
        booking_date TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'pending',
        base_price REAL NOT NULL,
        additional_fees REAL NOT NULL DEFAULT 0,
        discount REAL NOT NULL DEFAULT 0,
        total_amount REAL NOT NULL,
        currency TEXT NOT NULL DEFAULT 'MAD',
        payment_status TEXT NOT NULL DEFAULT 'pending',
        participant_count INTEGER NOT NULL DEFAULT 1,
        participant_details TEXT NOT NULL DEFAULT '[]',
        location_type TEXT NOT NULL DEFAULT 'studio',
        location_address TEXT NOT NULL DEFAULT '{}',
        location_notes TEXT,
        photographer_name TEXT NOT NULL DEFAULT 'unassigned',
        photographer_email TEXT,
        photographer_phone TEXT,
        photographer_assigned_at TEXT,
        special_requests TEXT,
        client_notes TEXT,
        admin_notes TEXT,
        confirmed_at TEXT,
        cancellation_reason TEXT,
        cancelled_by TEXT,
        cancelled_at TEXT,
        refund_status TEXT,
        checkout_session_id TEXT,
        payment_ref TEXT,
        created_by TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    CREATE INDEX idx_bookings_date_status ON bookings(booking_date, status);
    CREATE INDEX idx_bookings_client ON bookings(client_id, booking_date);
    CREATE INDEX idx_bookings_session ON bookings(checkout_session_id);

    CREATE TABLE status_history (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        booking_id TEXT NOT NULL REFERENCES bookings(id) ON DELETE CASCADE,
        status TEXT NOT NULL,
        changed_by TEXT NOT NULL,
        changed_at TEXT NOT NULL,
        reason TEXT NOT NULL
    );
    CREATE INDEX idx_history_booking ON status_history(booking_id);

    CREATE TABLE notifications (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id),
        booking_id TEXT REFERENCES bookings(id) ON DELETE CASCADE,
        kind TEXT NOT NULL,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        is_read INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL
    );
    CREATE INDEX idx_notifications_user ON notifications(user_id, created_at);",
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
