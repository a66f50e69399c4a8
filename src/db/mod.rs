/// Database layer for persistent storage.
/// Handles all database operations for users, groups, memberships, and
/// messages.

pub mod init;
pub mod models;

use models::{Group, Message, MessageDraft, Recipient, User};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type DbPool = Arc<Mutex<Connection>>;

/// Create a connection pool (simplified for single-threaded SQLite)
pub fn create_pool(db_path: &str) -> SqliteResult<DbPool> {
    let conn = Connection::open(db_path)?;
    init::initialize_database(&conn)?;
    Ok(Arc::new(Mutex::new(conn)))
}

/// Create an in-memory database for testing
pub fn create_test_pool() -> DbPool {
    let conn = Connection::open_in_memory().expect("Failed to create in-memory DB");
    init::initialize_database(&conn).expect("Failed to initialize DB");
    Arc::new(Mutex::new(conn))
}

/// Shared SELECT for messages with sender/recipient names joined in at read
/// time, so callers can render usernames and groupnames without extra round
/// trips.
const MESSAGE_SELECT: &str = "SELECT m.id, m.sender_id, s.username, \
    m.recipient_id, r.username, m.group_id, g.groupname, \
    m.reply_to_id, m.subject, m.body, m.sent_at \
    FROM messages m \
    JOIN users s ON s.id = m.sender_id \
    LEFT JOIN users r ON r.id = m.recipient_id \
    LEFT JOIN groups g ON g.id = m.group_id";

fn message_from_row(row: &Row<'_>) -> SqliteResult<Message> {
    let recipient_id: Option<i64> = row.get(3)?;
    let recipient_user: Option<String> = row.get(4)?;
    let group_id: Option<i64> = row.get(5)?;
    let groupname: Option<String> = row.get(6)?;

    // The schema CHECK guarantees exactly one target; a row that violates it
    // is corrupt and must not be silently mapped.
    let (recipient, recipient_name) = match (recipient_id, group_id) {
        (Some(id), None) => (Recipient::User(id), recipient_user.unwrap_or_default()),
        (None, Some(id)) => (Recipient::Group(id), groupname.unwrap_or_default()),
        _ => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Null,
                "message row addresses both or neither of user and group".into(),
            ))
        }
    };

    Ok(Message {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        sender: row.get(2)?,
        recipient,
        recipient_name,
        reply_to_id: row.get(7)?,
        subject: row.get(8)?,
        body: row.get(9)?,
        sent_at: row.get(10)?,
    })
}

fn query_message(conn: &Connection, id: i64) -> SqliteResult<Option<Message>> {
    let mut stmt = conn.prepare(&format!("{} WHERE m.id = ?1", MESSAGE_SELECT))?;
    stmt.query_row(params![id], message_from_row).optional()
}

fn query_group_ids(conn: &Connection, user_id: i64) -> SqliteResult<Vec<i64>> {
    let mut stmt =
        conn.prepare("SELECT group_id FROM group_members WHERE user_id = ?1")?;
    let ids = stmt
        .query_map(params![user_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(ids)
}

// `?,?,...,?` for a dynamic parameter list
fn repeat_vars(count: usize) -> String {
    let mut vars = "?,".repeat(count);
    vars.pop();
    vars
}

/// Database operations
pub struct Database;

impl Database {
    /// Register a new user
    pub async fn create_user(pool: &DbPool, username: &str) -> SqliteResult<User> {
        let conn = pool.lock().await;

        conn.execute(
            "INSERT INTO users (username) VALUES (?1)",
            params![username],
        )?;

        // Retrieve the inserted user
        let mut stmt = conn.prepare("SELECT id, username FROM users WHERE username = ?1")?;
        let user = stmt.query_row(params![username], |row| {
            Ok(User {
                id: row.get(0)?,
                username: row.get(1)?,
            })
        })?;

        Ok(user)
    }

    /// Get user by username (case-sensitive exact match)
    pub async fn find_user(pool: &DbPool, username: &str) -> SqliteResult<Option<User>> {
        let conn = pool.lock().await;

        let mut stmt = conn.prepare("SELECT id, username FROM users WHERE username = ?1")?;

        let user = stmt
            .query_row(params![username], |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            })
            .optional()?;

        Ok(user)
    }

    /// Bulk lookup by username. Returns only the users that exist; the
    /// caller compares cardinality against its input to detect missing
    /// entries.
    pub async fn find_users(pool: &DbPool, usernames: &[String]) -> SqliteResult<Vec<User>> {
        if usernames.is_empty() {
            return Ok(Vec::new());
        }
        let conn = pool.lock().await;

        let sql = format!(
            "SELECT id, username FROM users WHERE username IN ({})",
            repeat_vars(usernames.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let users = stmt
            .query_map(params_from_iter(usernames.iter()), |row| {
                Ok(User {
                    id: row.get(0)?,
                    username: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Get group by groupname
    pub async fn find_group(pool: &DbPool, groupname: &str) -> SqliteResult<Option<Group>> {
        let conn = pool.lock().await;

        let mut stmt = conn.prepare("SELECT id, groupname FROM groups WHERE groupname = ?1")?;

        let group = stmt
            .query_row(params![groupname], |row| {
                Ok(Group {
                    id: row.get(0)?,
                    groupname: row.get(1)?,
                })
            })
            .optional()?;

        Ok(group)
    }

    pub async fn group_exists(pool: &DbPool, groupname: &str) -> SqliteResult<bool> {
        Ok(Self::find_group(pool, groupname).await?.is_some())
    }

    /// Create a group together with its membership rows in one transaction.
    /// Membership is fixed at creation; a failed member insert rolls back
    /// the group row as well.
    pub async fn create_group(
        pool: &DbPool,
        groupname: &str,
        members: &[User],
    ) -> SqliteResult<Group> {
        let mut conn = pool.lock().await;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO groups (groupname) VALUES (?1)",
            params![groupname],
        )?;
        let group_id = tx.last_insert_rowid();

        {
            let mut stmt =
                tx.prepare("INSERT INTO group_members (group_id, user_id) VALUES (?1, ?2)")?;
            for member in members {
                stmt.execute(params![group_id, member.id])?;
            }
        }

        tx.commit()?;

        Ok(Group {
            id: group_id,
            groupname: groupname.to_string(),
        })
    }

    /// Every group the user belongs to; feeds mailbox resolution.
    pub async fn group_ids_for_user(pool: &DbPool, user_id: i64) -> SqliteResult<Vec<i64>> {
        let conn = pool.lock().await;
        query_group_ids(&conn, user_id)
    }

    /// Insert a resolved message draft and return the stored row with
    /// names resolved
    pub async fn create_message(pool: &DbPool, draft: &MessageDraft) -> SqliteResult<Message> {
        let conn = pool.lock().await;

        conn.execute(
            "INSERT INTO messages (sender_id, recipient_id, group_id, reply_to_id, subject, body, sent_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                draft.sender_id,
                draft.recipient.user_id(),
                draft.recipient.group_id(),
                draft.reply_to_id,
                draft.subject,
                draft.body,
                draft.sent_at,
            ],
        )?;
        let id = conn.last_insert_rowid();

        query_message(&conn, id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)
    }

    /// Fetch a message by id, names resolved. Absence is a valid result,
    /// not an error.
    pub async fn get_message(pool: &DbPool, id: i64) -> SqliteResult<Option<Message>> {
        let conn = pool.lock().await;
        query_message(&conn, id)
    }

    /// All messages replying to the given id, most recent first
    pub async fn get_replies(pool: &DbPool, message_id: i64) -> SqliteResult<Vec<Message>> {
        let conn = pool.lock().await;

        let sql = format!(
            "{} WHERE m.reply_to_id = ?1 ORDER BY m.sent_at DESC, m.id DESC",
            MESSAGE_SELECT
        );
        let mut stmt = conn.prepare(&sql)?;
        let messages = stmt
            .query_map(params![message_id], message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    /// Messages visible to the user, most recent first: addressed to the
    /// user directly, or to a group the user belongs to. A message has
    /// exactly one addressing target, so the two cannot overlap and no
    /// dedup is needed. Membership, not authorship, gates visibility.
    pub async fn mailbox(pool: &DbPool, user_id: i64) -> SqliteResult<Vec<Message>> {
        let conn = pool.lock().await;
        let group_ids = query_group_ids(&conn, user_id)?;

        let (sql, bound): (String, Vec<i64>) = if group_ids.is_empty() {
            (
                format!(
                    "{} WHERE m.recipient_id = ?1 ORDER BY m.sent_at DESC, m.id DESC",
                    MESSAGE_SELECT
                ),
                vec![user_id],
            )
        } else {
            let mut bound = Vec::with_capacity(group_ids.len() + 1);
            bound.push(user_id);
            bound.extend(group_ids.iter().copied());
            (
                format!(
                    "{} WHERE m.recipient_id = ?1 OR m.group_id IN ({}) \
                     ORDER BY m.sent_at DESC, m.id DESC",
                    MESSAGE_SELECT,
                    repeat_vars(group_ids.len())
                ),
                bound,
            )
        };

        let mut stmt = conn.prepare(&sql)?;
        let messages = stmt
            .query_map(params_from_iter(bound.iter()), message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(messages)
    }

    /// Storage reachability probe for the health endpoint
    pub async fn ping(pool: &DbPool) -> SqliteResult<bool> {
        let conn = pool.lock().await;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'users'",
            [],
            |row| row.get(0),
        )?;
        Ok(count == 1)
    }
}
