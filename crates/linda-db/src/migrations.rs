use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id                  INTEGER PRIMARY KEY AUTOINCREMENT,
                open_id             TEXT NOT NULL UNIQUE,
                name                TEXT,
                email               TEXT,
                login_method        TEXT,
                password_hash       TEXT,
                role                TEXT NOT NULL DEFAULT 'user',
                preferred_language  TEXT NOT NULL DEFAULT 'en',
                created_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at          TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                last_signed_in      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE chat_messages (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL REFERENCES users(id),
                role        TEXT NOT NULL,
                content     TEXT NOT NULL,
                language    TEXT NOT NULL,
                audio_url   TEXT,
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_chat_messages_user
                ON chat_messages(user_id, created_at);

            CREATE TABLE reports (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id       INTEGER REFERENCES users(id),
                abuse_type    TEXT NOT NULL,
                description   TEXT NOT NULL,
                audio_url     TEXT,
                photo_url     TEXT,
                latitude      TEXT,
                longitude     TEXT,
                is_anonymous  INTEGER NOT NULL DEFAULT 0,
                status        TEXT NOT NULL DEFAULT 'pending',
                created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_reports_user
                ON reports(user_id, created_at);

            CREATE TABLE lessons (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                title_en          TEXT NOT NULL,
                title_sw          TEXT NOT NULL,
                content_en        TEXT NOT NULL,
                content_sw        TEXT NOT NULL,
                illustration_url  TEXT,
                audio_url_en      TEXT,
                audio_url_sw      TEXT,
                video_url         TEXT,
                order_index       INTEGER NOT NULL,
                created_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE learning_progress (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id       INTEGER NOT NULL REFERENCES users(id),
                lesson_id     INTEGER NOT NULL REFERENCES lessons(id),
                completed     INTEGER NOT NULL DEFAULT 0,
                completed_at  TEXT,
                created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                UNIQUE(user_id, lesson_id)
            );

            CREATE TABLE privacy_tips (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                title_en     TEXT NOT NULL,
                title_sw     TEXT NOT NULL,
                content_en   TEXT NOT NULL,
                content_sw   TEXT NOT NULL,
                icon         TEXT NOT NULL,
                order_index  INTEGER NOT NULL,
                created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE stories (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id       INTEGER REFERENCES users(id),
                content       TEXT NOT NULL,
                audio_url     TEXT,
                language      TEXT NOT NULL,
                is_anonymous  INTEGER NOT NULL DEFAULT 0,
                reactions     TEXT,
                created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE help_centers (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name_en         TEXT NOT NULL,
                name_sw         TEXT NOT NULL,
                description_en  TEXT,
                description_sw  TEXT,
                latitude        TEXT NOT NULL,
                longitude       TEXT NOT NULL,
                address         TEXT,
                phone           TEXT,
                email           TEXT,
                website         TEXT,
                type            TEXT NOT NULL,
                created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
