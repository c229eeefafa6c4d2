//! SQLite backend for conversations and commerce data.
//!
//! Uses a single SQLite database (WAL mode, foreign keys on). Schema is
//! created in code at startup; messages are cascade-deleted with their
//! conversation. Timestamps are stored as RFC 3339 text.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use helpdesk_core::agent::AgentType;
use helpdesk_core::error::StorageError;
use helpdesk_core::message::{Conversation, Role, StoredMessage};
use helpdesk_core::store::{
    CommerceStore, ConversationDigest, ConversationPage, ConversationStore, ConversationSummary,
    DigestMessage, Invoice, InvoiceStatus, InvoiceSummary, Order, OrderItem, OrderStatus, Refund,
    RefundStatus,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

/// A SQLite-backed store implementing both storage traits.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url` and run migrations.
    ///
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| StorageError::Storage(format!("Invalid SQLite URL: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {url}");
        Ok(store)
    }

    /// Run schema migrations — creates all tables and indexes.
    async fn run_migrations(&self) -> Result<(), StorageError> {
        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id              TEXT PRIMARY KEY,
                user_id         TEXT NOT NULL,
                title           TEXT,
                status          TEXT NOT NULL DEFAULT 'active',
                last_agent_type TEXT,
                context_summary TEXT,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS messages (
                id              TEXT PRIMARY KEY,
                conversation_id TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
                role            TEXT NOT NULL,
                content         TEXT NOT NULL,
                agent_type      TEXT,
                tool_calls      TEXT,
                metadata        TEXT,
                created_at      TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id                 TEXT PRIMARY KEY,
                order_number       TEXT UNIQUE NOT NULL,
                user_id            TEXT NOT NULL,
                status             TEXT NOT NULL,
                total_amount       REAL NOT NULL,
                shipping_address   TEXT,
                tracking_number    TEXT,
                estimated_delivery TEXT,
                created_at         TEXT NOT NULL,
                updated_at         TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS order_items (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id     TEXT NOT NULL REFERENCES orders(id) ON DELETE CASCADE,
                product_name TEXT NOT NULL,
                category     TEXT,
                quantity     INTEGER NOT NULL,
                unit_price   REAL NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS invoices (
                id             TEXT PRIMARY KEY,
                invoice_number TEXT UNIQUE NOT NULL,
                order_id       TEXT NOT NULL REFERENCES orders(id),
                user_id        TEXT NOT NULL,
                amount         REAL NOT NULL,
                status         TEXT NOT NULL,
                due_date       TEXT,
                paid_at        TEXT,
                created_at     TEXT NOT NULL
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS refunds (
                id           TEXT PRIMARY KEY,
                order_id     TEXT NOT NULL REFERENCES orders(id),
                user_id      TEXT NOT NULL,
                amount       REAL NOT NULL,
                status       TEXT NOT NULL,
                reason       TEXT NOT NULL,
                requested_at TEXT NOT NULL,
                processed_at TEXT
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id, created_at)",
            "CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations(user_id, updated_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_orders_user ON orders(user_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_invoices_user ON invoices(user_id, created_at DESC)",
            "CREATE INDEX IF NOT EXISTS idx_refunds_order ON refunds(order_id)",
            "CREATE INDEX IF NOT EXISTS idx_refunds_user ON refunds(user_id)",
        ];

        for sql in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ── Row mappers ───────────────────────────────────────────────────────

    fn get_text(row: &sqlx::sqlite::SqliteRow, column: &str) -> Result<String, StorageError> {
        row.try_get(column)
            .map_err(|e| StorageError::QueryFailed(format!("{column} column: {e}")))
    }

    fn get_opt_text(
        row: &sqlx::sqlite::SqliteRow,
        column: &str,
    ) -> Result<Option<String>, StorageError> {
        row.try_get(column)
            .map_err(|e| StorageError::QueryFailed(format!("{column} column: {e}")))
    }

    fn parse_timestamp(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn parse_opt_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
        raw.map(|s| Self::parse_timestamp(&s))
    }

    fn row_to_conversation(row: &sqlx::sqlite::SqliteRow) -> Result<Conversation, StorageError> {
        let last_agent_type = Self::get_opt_text(row, "last_agent_type")?
            .as_deref()
            .and_then(AgentType::parse);

        Ok(Conversation {
            id: Self::get_text(row, "id")?,
            user_id: Self::get_text(row, "user_id")?,
            title: Self::get_opt_text(row, "title")?,
            status: Self::get_text(row, "status")?,
            last_agent_type,
            context_summary: Self::get_opt_text(row, "context_summary")?,
            created_at: Self::parse_timestamp(&Self::get_text(row, "created_at")?),
            updated_at: Self::parse_timestamp(&Self::get_text(row, "updated_at")?),
            messages: Vec::new(),
        })
    }

    fn row_to_message(row: &sqlx::sqlite::SqliteRow) -> Result<StoredMessage, StorageError> {
        let role_raw = Self::get_text(row, "role")?;
        let role = Role::parse(&role_raw)
            .ok_or_else(|| StorageError::QueryFailed(format!("Unknown role '{role_raw}'")))?;

        let agent_type = Self::get_opt_text(row, "agent_type")?
            .as_deref()
            .and_then(AgentType::parse);

        let tool_calls = Self::get_opt_text(row, "tool_calls")?
            .and_then(|raw| serde_json::from_str(&raw).ok());
        let metadata = Self::get_opt_text(row, "metadata")?
            .and_then(|raw| serde_json::from_str(&raw).ok());

        Ok(StoredMessage {
            id: Self::get_text(row, "id")?,
            conversation_id: Self::get_text(row, "conversation_id")?,
            role,
            content: Self::get_text(row, "content")?,
            agent_type,
            tool_calls,
            metadata,
            created_at: Self::parse_timestamp(&Self::get_text(row, "created_at")?),
        })
    }

    fn row_to_order(row: &sqlx::sqlite::SqliteRow) -> Result<Order, StorageError> {
        let status_raw = Self::get_text(row, "status")?;
        let status = OrderStatus::parse(&status_raw)
            .ok_or_else(|| StorageError::QueryFailed(format!("Unknown order status '{status_raw}'")))?;

        let total_amount: f64 = row
            .try_get("total_amount")
            .map_err(|e| StorageError::QueryFailed(format!("total_amount column: {e}")))?;

        Ok(Order {
            id: Self::get_text(row, "id")?,
            order_number: Self::get_text(row, "order_number")?,
            user_id: Self::get_text(row, "user_id")?,
            status,
            total_amount,
            shipping_address: Self::get_opt_text(row, "shipping_address")?,
            tracking_number: Self::get_opt_text(row, "tracking_number")?,
            estimated_delivery: Self::parse_opt_timestamp(Self::get_opt_text(
                row,
                "estimated_delivery",
            )?),
            items: Vec::new(),
            invoice: None,
            refunds: Vec::new(),
            created_at: Self::parse_timestamp(&Self::get_text(row, "created_at")?),
            updated_at: Self::parse_timestamp(&Self::get_text(row, "updated_at")?),
        })
    }

    fn row_to_refund(row: &sqlx::sqlite::SqliteRow) -> Result<Refund, StorageError> {
        let status_raw = Self::get_text(row, "status")?;
        let status = RefundStatus::parse(&status_raw).ok_or_else(|| {
            StorageError::QueryFailed(format!("Unknown refund status '{status_raw}'"))
        })?;

        let amount: f64 = row
            .try_get("amount")
            .map_err(|e| StorageError::QueryFailed(format!("amount column: {e}")))?;

        Ok(Refund {
            id: Self::get_text(row, "id")?,
            order_id: Self::get_text(row, "order_id")?,
            order_number: Self::get_text(row, "order_number")?,
            user_id: Self::get_text(row, "user_id")?,
            amount,
            status,
            reason: Self::get_text(row, "reason")?,
            requested_at: Self::parse_timestamp(&Self::get_text(row, "requested_at")?),
            processed_at: Self::parse_opt_timestamp(Self::get_opt_text(row, "processed_at")?),
        })
    }

    async fn items_for_order(&self, order_id: &str) -> Result<Vec<OrderItem>, StorageError> {
        let rows = sqlx::query(
            "SELECT product_name, category, quantity, unit_price FROM order_items WHERE order_id = ?1 ORDER BY id",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("order items: {e}")))?;

        rows.iter()
            .map(|row| {
                let quantity: i64 = row
                    .try_get("quantity")
                    .map_err(|e| StorageError::QueryFailed(format!("quantity column: {e}")))?;
                let unit_price: f64 = row
                    .try_get("unit_price")
                    .map_err(|e| StorageError::QueryFailed(format!("unit_price column: {e}")))?;
                Ok(OrderItem {
                    product_name: Self::get_text(row, "product_name")?,
                    category: Self::get_opt_text(row, "category")?,
                    quantity: quantity.max(0) as u32,
                    unit_price,
                })
            })
            .collect()
    }

    // ── Seed/test insert helpers ──────────────────────────────────────────

    /// Insert an order with its items. The `invoice`/`refunds` fields of
    /// the record are ignored; insert those separately.
    pub async fn insert_order(&self, order: &Order) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, user_id, status, total_amount,
                                shipping_address, tracking_number, estimated_delivery,
                                created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&order.id)
        .bind(&order.order_number)
        .bind(&order.user_id)
        .bind(order.status.as_str())
        .bind(order.total_amount)
        .bind(&order.shipping_address)
        .bind(&order.tracking_number)
        .bind(order.estimated_delivery.map(|dt| dt.to_rfc3339()))
        .bind(order.created_at.to_rfc3339())
        .bind(order.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(format!("INSERT order: {e}")))?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (order_id, product_name, category, quantity, unit_price) VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&order.id)
            .bind(&item.product_name)
            .bind(&item.category)
            .bind(item.quantity as i64)
            .bind(item.unit_price)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Storage(format!("INSERT order item: {e}")))?;
        }

        Ok(())
    }

    pub async fn insert_invoice(&self, invoice: &Invoice) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (id, invoice_number, order_id, user_id, amount,
                                  status, due_date, paid_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(&invoice.order_id)
        .bind(&invoice.user_id)
        .bind(invoice.amount)
        .bind(invoice.status.as_str())
        .bind(invoice.due_date.map(|dt| dt.to_rfc3339()))
        .bind(invoice.paid_at.map(|dt| dt.to_rfc3339()))
        .bind(invoice.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(format!("INSERT invoice: {e}")))?;
        Ok(())
    }

    pub async fn insert_refund(&self, refund: &Refund) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO refunds (id, order_id, user_id, amount, status, reason,
                                 requested_at, processed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&refund.id)
        .bind(&refund.order_id)
        .bind(&refund.user_id)
        .bind(refund.amount)
        .bind(refund.status.as_str())
        .bind(&refund.reason)
        .bind(refund.requested_at.to_rfc3339())
        .bind(refund.processed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(format!("INSERT refund: {e}")))?;
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for SqliteStore {
    async fn create_conversation(
        &self,
        user_id: &str,
        title: Option<&str>,
    ) -> Result<Conversation, StorageError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let title = title.unwrap_or("New Conversation");

        sqlx::query(
            r#"
            INSERT INTO conversations (id, user_id, title, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, 'active', ?4, ?4)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(title)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(format!("INSERT conversation: {e}")))?;

        debug!(conversation_id = %id, user_id, "Created conversation");

        Ok(Conversation {
            id,
            user_id: user_id.to_string(),
            title: Some(title.to_string()),
            status: "active".into(),
            last_agent_type: None,
            context_summary: None,
            created_at: now,
            updated_at: now,
            messages: Vec::new(),
        })
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, StorageError> {
        let row = sqlx::query("SELECT * FROM conversations WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("SELECT conversation: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut conversation = Self::row_to_conversation(&row)?;
        conversation.messages = self.list_messages(id).await?;
        Ok(Some(conversation))
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        role: Role,
        content: &str,
        agent_type: Option<AgentType>,
        tool_calls: Option<serde_json::Value>,
        metadata: Option<serde_json::Value>,
    ) -> Result<StoredMessage, StorageError> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let tool_calls_raw = tool_calls
            .as_ref()
            .map(|v| serde_json::to_string(v).unwrap_or_default());
        let metadata_raw = metadata
            .as_ref()
            .map(|v| serde_json::to_string(v).unwrap_or_default());

        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, role, content, agent_type,
                                  tool_calls, metadata, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&id)
        .bind(conversation_id)
        .bind(role.as_str())
        .bind(content)
        .bind(agent_type.map(|a| a.as_str()))
        .bind(&tool_calls_raw)
        .bind(&metadata_raw)
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(format!("INSERT message: {e}")))?;

        // Bump the conversation; keep the previous last_agent_type when the
        // appended message carries none (user messages).
        sqlx::query(
            "UPDATE conversations SET updated_at = ?1, last_agent_type = COALESCE(?2, last_agent_type) WHERE id = ?3",
        )
        .bind(now.to_rfc3339())
        .bind(agent_type.map(|a| a.as_str()))
        .bind(conversation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Storage(format!("UPDATE conversation: {e}")))?;

        Ok(StoredMessage {
            id,
            conversation_id: conversation_id.to_string(),
            role,
            content: content.to_string(),
            agent_type,
            tool_calls,
            metadata,
            created_at: now,
        })
    }

    async fn list_messages(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<StoredMessage>, StorageError> {
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE conversation_id = ?1 ORDER BY created_at ASC, rowid ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("SELECT messages: {e}")))?;

        rows.iter().map(Self::row_to_message).collect()
    }

    async fn update_summary(
        &self,
        conversation_id: &str,
        summary: &str,
    ) -> Result<(), StorageError> {
        sqlx::query("UPDATE conversations SET context_summary = ?1 WHERE id = ?2")
            .bind(summary)
            .bind(conversation_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Storage(format!("UPDATE summary: {e}")))?;
        Ok(())
    }

    async fn list_conversations(
        &self,
        user_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<ConversationPage, StorageError> {
        let rows = sqlx::query(
            r#"
            SELECT c.*,
                   (SELECT content FROM messages m
                    WHERE m.conversation_id = c.id
                    ORDER BY m.created_at DESC, m.rowid DESC LIMIT 1) AS last_message,
                   (SELECT COUNT(*) FROM messages m
                    WHERE m.conversation_id = c.id) AS message_count
            FROM conversations c
            WHERE c.user_id = ?1
            ORDER BY c.updated_at DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("SELECT conversations: {e}")))?;

        let items: Result<Vec<ConversationSummary>, StorageError> = rows
            .iter()
            .map(|row| {
                let conversation = Self::row_to_conversation(row)?;
                let message_count: i64 = row
                    .try_get("message_count")
                    .map_err(|e| StorageError::QueryFailed(format!("message_count: {e}")))?;
                Ok(ConversationSummary {
                    id: conversation.id,
                    title: conversation.title,
                    status: conversation.status,
                    last_agent_type: conversation.last_agent_type,
                    last_message: Self::get_opt_text(row, "last_message")?,
                    message_count: message_count.max(0) as usize,
                    created_at: conversation.created_at,
                    updated_at: conversation.updated_at,
                })
            })
            .collect();

        let total_row = sqlx::query("SELECT COUNT(*) AS total FROM conversations WHERE user_id = ?1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("COUNT conversations: {e}")))?;
        let total: i64 = total_row
            .try_get("total")
            .map_err(|e| StorageError::QueryFailed(format!("total column: {e}")))?;

        Ok(ConversationPage {
            items: items?,
            total: total.max(0) as usize,
        })
    }

    async fn delete_conversation(&self, id: &str) -> Result<bool, StorageError> {
        // Messages cascade via the foreign key.
        let result = sqlx::query("DELETE FROM conversations WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Storage(format!("DELETE conversation: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn search_conversations(
        &self,
        user_id: &str,
        query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<ConversationDigest>, StorageError> {
        let rows = match query {
            Some(q) if !q.trim().is_empty() => {
                // Escape LIKE wildcards in the user-supplied keyword.
                let escaped = q.trim().replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
                let pattern = format!("%{escaped}%");
                sqlx::query(
                    r#"
                    SELECT * FROM conversations c
                    WHERE c.user_id = ?1
                      AND EXISTS (SELECT 1 FROM messages m
                                  WHERE m.conversation_id = c.id
                                    AND m.content LIKE ?2 ESCAPE '\' COLLATE NOCASE)
                    ORDER BY c.updated_at DESC
                    LIMIT ?3
                    "#,
                )
                .bind(user_id)
                .bind(pattern)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
            _ => {
                sqlx::query(
                    "SELECT * FROM conversations WHERE user_id = ?1 ORDER BY updated_at DESC LIMIT ?2",
                )
                .bind(user_id)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| StorageError::QueryFailed(format!("search conversations: {e}")))?;

        let mut digests = Vec::with_capacity(rows.len());
        for row in &rows {
            let conversation = Self::row_to_conversation(row)?;

            let message_rows = sqlx::query(
                "SELECT * FROM messages WHERE conversation_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT 3",
            )
            .bind(&conversation.id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("digest messages: {e}")))?;

            let recent_messages: Result<Vec<DigestMessage>, StorageError> = message_rows
                .iter()
                .map(|m| {
                    let msg = Self::row_to_message(m)?;
                    Ok(DigestMessage {
                        role: msg.role,
                        content: msg.content,
                        agent_type: msg.agent_type,
                        created_at: msg.created_at,
                    })
                })
                .collect();

            digests.push(ConversationDigest {
                id: conversation.id,
                title: conversation.title,
                last_agent_type: conversation.last_agent_type,
                updated_at: conversation.updated_at,
                recent_messages: recent_messages?,
            });
        }

        Ok(digests)
    }
}

#[async_trait]
impl CommerceStore for SqliteStore {
    async fn order_by_number(&self, order_number: &str) -> Result<Option<Order>, StorageError> {
        let row = sqlx::query("SELECT * FROM orders WHERE order_number = ?1")
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::QueryFailed(format!("SELECT order: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut order = Self::row_to_order(&row)?;
        order.items = self.items_for_order(&order.id).await?;

        // Invoice summary, if one exists for this order
        let invoice_row = sqlx::query(
            "SELECT invoice_number, amount, status, due_date, paid_at FROM invoices WHERE order_id = ?1",
        )
        .bind(&order.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("order invoice: {e}")))?;

        if let Some(inv) = invoice_row {
            let status_raw = Self::get_text(&inv, "status")?;
            let status = InvoiceStatus::parse(&status_raw).ok_or_else(|| {
                StorageError::QueryFailed(format!("Unknown invoice status '{status_raw}'"))
            })?;
            let amount: f64 = inv
                .try_get("amount")
                .map_err(|e| StorageError::QueryFailed(format!("amount column: {e}")))?;
            order.invoice = Some(InvoiceSummary {
                invoice_number: Self::get_text(&inv, "invoice_number")?,
                amount,
                status,
                due_date: Self::parse_opt_timestamp(Self::get_opt_text(&inv, "due_date")?),
                paid_at: Self::parse_opt_timestamp(Self::get_opt_text(&inv, "paid_at")?),
            });
        }

        let refund_rows = sqlx::query(
            r#"
            SELECT r.*, o.order_number FROM refunds r
            JOIN orders o ON o.id = r.order_id
            WHERE r.order_id = ?1
            ORDER BY r.requested_at DESC
            "#,
        )
        .bind(&order.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("order refunds: {e}")))?;

        order.refunds = refund_rows
            .iter()
            .map(Self::row_to_refund)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(order))
    }

    async fn orders_for_user(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        limit: usize,
    ) -> Result<Vec<Order>, StorageError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    "SELECT * FROM orders WHERE user_id = ?1 AND status = ?2 ORDER BY created_at DESC LIMIT ?3",
                )
                .bind(user_id)
                .bind(status.as_str())
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT * FROM orders WHERE user_id = ?1 ORDER BY created_at DESC LIMIT ?2",
                )
                .bind(user_id)
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| StorageError::QueryFailed(format!("SELECT user orders: {e}")))?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut order = Self::row_to_order(row)?;
            order.items = self.items_for_order(&order.id).await?;
            orders.push(order);
        }
        Ok(orders)
    }

    async fn invoice_by_number(
        &self,
        invoice_number: &str,
    ) -> Result<Option<Invoice>, StorageError> {
        let row = sqlx::query(
            r#"
            SELECT i.*, o.order_number, o.status AS order_status FROM invoices i
            JOIN orders o ON o.id = i.order_id
            WHERE i.invoice_number = ?1
            "#,
        )
        .bind(invoice_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryFailed(format!("SELECT invoice: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut invoice = Self::row_to_invoice(&row)?;
        invoice.items = self.items_for_order(&invoice.order_id).await?;
        Ok(Some(invoice))
    }

    async fn invoices_for_user(
        &self,
        user_id: &str,
        status: Option<InvoiceStatus>,
    ) -> Result<Vec<Invoice>, StorageError> {
        let rows = match status {
            Some(status) => {
                sqlx::query(
                    r#"
                    SELECT i.*, o.order_number, o.status AS order_status FROM invoices i
                    JOIN orders o ON o.id = i.order_id
                    WHERE i.user_id = ?1 AND i.status = ?2
                    ORDER BY i.created_at DESC
                    "#,
                )
                .bind(user_id)
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT i.*, o.order_number, o.status AS order_status FROM invoices i
                    JOIN orders o ON o.id = i.order_id
                    WHERE i.user_id = ?1
                    ORDER BY i.created_at DESC
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| StorageError::QueryFailed(format!("SELECT user invoices: {e}")))?;

        rows.iter().map(Self::row_to_invoice).collect()
    }

    async fn refunds(
        &self,
        order_number: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<Vec<Refund>, StorageError> {
        let rows = match (order_number, user_id) {
            (Some(order_number), Some(user_id)) => {
                sqlx::query(
                    r#"
                    SELECT r.*, o.order_number FROM refunds r
                    JOIN orders o ON o.id = r.order_id
                    WHERE o.order_number = ?1 AND r.user_id = ?2
                    ORDER BY r.requested_at DESC
                    "#,
                )
                .bind(order_number)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
            (Some(order_number), None) => {
                sqlx::query(
                    r#"
                    SELECT r.*, o.order_number FROM refunds r
                    JOIN orders o ON o.id = r.order_id
                    WHERE o.order_number = ?1
                    ORDER BY r.requested_at DESC
                    "#,
                )
                .bind(order_number)
                .fetch_all(&self.pool)
                .await
            }
            (None, Some(user_id)) => {
                sqlx::query(
                    r#"
                    SELECT r.*, o.order_number FROM refunds r
                    JOIN orders o ON o.id = r.order_id
                    WHERE r.user_id = ?1
                    ORDER BY r.requested_at DESC
                    "#,
                )
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
            }
            (None, None) => {
                return Err(StorageError::QueryFailed(
                    "refunds requires an order number or a user id".into(),
                ));
            }
        }
        .map_err(|e| StorageError::QueryFailed(format!("SELECT refunds: {e}")))?;

        rows.iter().map(Self::row_to_refund).collect()
    }
}

impl SqliteStore {
    fn row_to_invoice(row: &sqlx::sqlite::SqliteRow) -> Result<Invoice, StorageError> {
        let status_raw = Self::get_text(row, "status")?;
        let status = InvoiceStatus::parse(&status_raw).ok_or_else(|| {
            StorageError::QueryFailed(format!("Unknown invoice status '{status_raw}'"))
        })?;

        let order_status_raw = Self::get_text(row, "order_status")?;
        let order_status = OrderStatus::parse(&order_status_raw).ok_or_else(|| {
            StorageError::QueryFailed(format!("Unknown order status '{order_status_raw}'"))
        })?;

        let amount: f64 = row
            .try_get("amount")
            .map_err(|e| StorageError::QueryFailed(format!("amount column: {e}")))?;

        Ok(Invoice {
            id: Self::get_text(row, "id")?,
            invoice_number: Self::get_text(row, "invoice_number")?,
            user_id: Self::get_text(row, "user_id")?,
            order_id: Self::get_text(row, "order_id")?,
            order_number: Self::get_text(row, "order_number")?,
            order_status,
            amount,
            status,
            due_date: Self::parse_opt_timestamp(Self::get_opt_text(row, "due_date")?),
            paid_at: Self::parse_opt_timestamp(Self::get_opt_text(row, "paid_at")?),
            items: Vec::new(),
            created_at: Self::parse_timestamp(&Self::get_text(row, "created_at")?),
        })
    }
}
