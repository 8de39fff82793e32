//! Postgres-backed ledger store implementation.
//!
//! Every unit of work runs in one SQL transaction. Stock changes use a guarded
//! update (`stock + delta >= 0` in the `WHERE` clause), so concurrent sales of
//! the same item serialize on the row lock and none can overdraw it.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError | Scenario |
//! |------------|----------------------|------------|----------|
//! | Database (unique violation) | `23505` | `Conflict` | Duplicate category name, SKU or email |
//! | Database (foreign key violation) | `23503` | `Conflict` | Deleting a category with items or an item with entries |
//! | Database (other) | Any other | `Backend` | Check constraint, syntax, etc. |
//! | PoolClosed / Io / other | N/A | `Backend` | Connection failures |

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use shopledger_auth::{Role, User};
use shopledger_core::{CategoryId, EntryId, ItemId, UserId};
use shopledger_inventory::{
    Category, CategorySummary, EntryDraft, EntryFilter, EntryKind, Item, LedgerEntry,
};

use super::r#trait::{LedgerStore, StoreError, StoreResult, conflict};

/// Schema applied by [`PostgresLedgerStore::migrate`].
pub const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

const ITEM_COLUMNS: &str = "id, sku, name, description, category_id, size, class, subject, \
     cost_price, sale_price, stock, created_at, updated_at";
const ENTRY_COLUMNS: &str = "id, item_id, kind, quantity, price, reference, created_at";
const USER_COLUMNS: &str = "id, email, password_hash, name, role, is_active, created_at";

/// Postgres-backed ledger store.
///
/// Uses the SQLx connection pool, which is thread-safe, so the store can be
/// shared behind an `Arc` across tasks.
#[derive(Debug, Clone)]
pub struct PostgresLedgerStore {
    pool: Arc<PgPool>,
}

impl PostgresLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    ///
    /// `password`, when given, replaces whatever password the URL carries.
    pub async fn connect(
        database_url: &str,
        password: Option<&str>,
        max_connections: u32,
    ) -> StoreResult<Self> {
        let mut options = PgConnectOptions::from_str(database_url)
            .map_err(|e| map_sqlx_error("parse_database_url", e))?;
        if let Some(password) = password {
            options = options.password(password);
        }
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables, constraints and indexes if they do not exist.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

/// Append `draft` and apply its delta inside `tx`.
///
/// The update only matches while the resulting stock stays non-negative. When
/// it matches nothing, the current row is re-read to tell a missing item from
/// an insufficient one. The caller owns commit/rollback.
async fn apply_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    draft: EntryDraft,
) -> StoreResult<(Item, LedgerEntry)> {
    let sql = format!(
        "UPDATE items SET stock = stock + $2, updated_at = NOW() \
         WHERE id = $1 AND stock + $2 >= 0 \
         RETURNING {ITEM_COLUMNS}"
    );
    let updated = sqlx::query(&sql)
        .bind(draft.item_id.as_uuid())
        .bind(draft.delta())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("update_stock", e))?;

    let item = match updated {
        Some(row) => ItemRecord::from_row(&row)
            .map(Item::from)
            .map_err(|e| map_sqlx_error("decode_item", e))?,
        None => {
            let current: Option<i64> = sqlx::query_scalar("SELECT stock FROM items WHERE id = $1")
                .bind(draft.item_id.as_uuid())
                .fetch_optional(&mut **tx)
                .await
                .map_err(|e| map_sqlx_error("read_stock", e))?;
            return Err(match current {
                Some(available) => StoreError::InsufficientStock {
                    available,
                    requested: draft.delta().abs(),
                },
                None => StoreError::NotFound("Item".to_string()),
            });
        }
    };

    let entry = draft.commit(EntryId::new(), Utc::now());
    sqlx::query(
        r#"
        INSERT INTO ledger_entries (id, item_id, kind, quantity, price, reference, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(entry.id.as_uuid())
    .bind(entry.item_id.as_uuid())
    .bind(entry.kind.as_str())
    .bind(entry.quantity)
    .bind(entry.price)
    .bind(&entry.reference)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_entry", e))?;

    Ok((item, entry))
}

#[async_trait]
impl LedgerStore for PostgresLedgerStore {
    #[instrument(skip(self, category), fields(name = %category.name), err)]
    async fn insert_category(&self, category: Category) -> StoreResult<Category> {
        sqlx::query(
            "INSERT INTO categories (id, name, description, created_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;
        Ok(category)
    }

    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn update_category(&self, category: Category) -> StoreResult<Category> {
        let result = sqlx::query("UPDATE categories SET name = $2, description = $3 WHERE id = $1")
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .bind(&category.description)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_category", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Category".to_string()));
        }
        Ok(category)
    }

    #[instrument(skip(self), err)]
    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Category".to_string()));
        }
        Ok(())
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query("SELECT id, name, description, created_at FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;
        row.map(|r| CategoryRecord::from_row(&r).map(Category::from))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_category", e))
    }

    async fn list_categories(&self) -> StoreResult<Vec<CategorySummary>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.name, c.description, c.created_at, COUNT(i.id) AS item_count
            FROM categories c
            LEFT JOIN items i ON i.category_id = c.id
            GROUP BY c.id
            ORDER BY c.name ASC
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_categories", e))?;

        rows.iter()
            .map(|row| {
                let category = Category::from(CategoryRecord::from_row(row)?);
                let item_count: i64 = row.try_get("item_count")?;
                Ok(CategorySummary {
                    category,
                    item_count: item_count as u64,
                })
            })
            .collect::<Result<_, sqlx::Error>>()
            .map_err(|e| map_sqlx_error("decode_category", e))
    }

    async fn count_items_in_category(&self, id: CategoryId) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM items WHERE category_id = $1")
            .bind(id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_items_in_category", e))?;
        Ok(count as u64)
    }

    #[instrument(skip(self, item, opening), fields(sku = %item.sku), err)]
    async fn insert_item(
        &self,
        item: Item,
        opening: Option<EntryDraft>,
    ) -> StoreResult<(Item, Option<LedgerEntry>)> {
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO items (
                id, sku, name, description, category_id, size, class, subject,
                cost_price, sale_price, stock, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, $11, $12)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.sku)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.category_id.as_uuid())
        .bind(&item.size)
        .bind(&item.class)
        .bind(&item.subject)
        .bind(item.cost_price)
        .bind(item.sale_price)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;

        let (item, entry) = match opening {
            Some(draft) => {
                let (item, entry) = apply_in_tx(&mut tx, draft).await?;
                (item, Some(entry))
            }
            None => (Item { stock: 0, ..item }, None),
        };

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok((item, entry))
    }

    #[instrument(skip(self, item), fields(item_id = %item.id), err)]
    async fn update_item(&self, item: Item) -> StoreResult<Item> {
        let sql = format!(
            "UPDATE items SET name = $2, description = $3, category_id = $4, size = $5, \
             class = $6, subject = $7, cost_price = $8, sale_price = $9, updated_at = $10 \
             WHERE id = $1 RETURNING {ITEM_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(item.id.as_uuid())
            .bind(&item.name)
            .bind(&item.description)
            .bind(item.category_id.as_uuid())
            .bind(&item.size)
            .bind(&item.class)
            .bind(&item.subject)
            .bind(item.cost_price)
            .bind(item.sale_price)
            .bind(item.updated_at)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_item", e))?
            .ok_or_else(|| StoreError::NotFound("Item".to_string()))?;
        ItemRecord::from_row(&row)
            .map(Item::from)
            .map_err(|e| map_sqlx_error("decode_item", e))
    }

    #[instrument(skip(self), err)]
    async fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("Item".to_string()));
        }
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;
        row.map(|r| ItemRecord::from_row(&r).map(Item::from))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_item", e))
    }

    async fn get_item_by_sku(&self, sku: &str) -> StoreResult<Option<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items WHERE sku = $1");
        let row = sqlx::query(&sql)
            .bind(sku)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item_by_sku", e))?;
        row.map(|r| ItemRecord::from_row(&r).map(Item::from))
            .transpose()
            .map_err(|e| map_sqlx_error("decode_item", e))
    }

    async fn scan_items(&self) -> StoreResult<Vec<Item>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM items");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("scan_items", e))?;
        rows.iter()
            .map(|r| ItemRecord::from_row(r).map(Item::from))
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_item", e))
    }

    async fn scan_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query("SELECT id, name, description, created_at FROM categories")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("scan_categories", e))?;
        rows.iter()
            .map(|r| CategoryRecord::from_row(r).map(Category::from))
            .collect::<Result<_, _>>()
            .map_err(|e| map_sqlx_error("decode_category", e))
    }

    #[instrument(
        skip(self, draft),
        fields(item_id = %draft.item_id, kind = %draft.kind, quantity = draft.quantity),
        err
    )]
    async fn apply_movement(&self, draft: EntryDraft) -> StoreResult<(Item, LedgerEntry)> {
        let mut tx = self.begin().await?;
        match apply_in_tx(&mut tx, draft).await {
            Ok(applied) => {
                tx.commit()
                    .await
                    .map_err(|e| map_sqlx_error("commit_transaction", e))?;
                Ok(applied)
            }
            Err(err) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                Err(err)
            }
        }
    }

    async fn list_entries(&self, filter: &EntryFilter) -> StoreResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries \
             WHERE ($1::uuid IS NULL OR item_id = $1) \
               AND ($2::text IS NULL OR kind = $2) \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3"
        );
        let rows = sqlx::query(&sql)
            .bind(filter.item_id.map(Uuid::from))
            .bind(filter.kind.map(EntryKind::as_str))
            .bind(sql_limit(filter.limit))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_entries", e))?;
        decode_entries(&rows)
    }

    async fn scan_entries(&self, kind: Option<EntryKind>) -> StoreResult<Vec<LedgerEntry>> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE ($1::text IS NULL OR kind = $1)"
        );
        let rows = sqlx::query(&sql)
            .bind(kind.map(EntryKind::as_str))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("scan_entries", e))?;
        decode_entries(&rows)
    }

    async fn count_entries_for_item(&self, id: ItemId) -> StoreResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ledger_entries WHERE item_id = $1")
            .bind(id.as_uuid())
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_entries_for_item", e))?;
        Ok(count as u64)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: User) -> StoreResult<User> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, name, role, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(user)
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update_user(&self, user: User) -> StoreResult<User> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET email = $2, password_hash = $3, name = $4, role = $5, is_active = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_user", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User".to_string()));
        }
        Ok(user)
    }

    #[instrument(skip(self), err)]
    async fn delete_user(&self, id: UserId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound("User".to_string()));
        }
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.map(|r| decode_user(&r)).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user_by_email", e))?;
        row.map(|r| decode_user(&r)).transpose()
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;
        rows.iter().map(decode_user).collect()
    }

    async fn get_school_name(&self) -> StoreResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT name FROM school WHERE id = 1")
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_school_name", e))
    }

    #[instrument(skip(self), err)]
    async fn set_school_name(&self, name: String) -> StoreResult<String> {
        sqlx::query_scalar::<_, String>(
            r#"
            INSERT INTO school (id, name) VALUES (1, $1)
            ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, updated_at = NOW()
            RETURNING name
            "#,
        )
        .bind(name)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("set_school_name", e))
    }
}

/// Map a SQLx error to a store error.
///
/// Constraint names from the schema decide the conflict message, so callers
/// see the same text as with the in-memory store.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => map_database_error(
            operation,
            db_err.code().as_deref(),
            db_err.constraint().unwrap_or_default(),
            db_err.message(),
        ),
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

/// Classify a database error by SQLSTATE and constraint name.
fn map_database_error(
    operation: &str,
    code: Option<&str>,
    constraint: &str,
    message: &str,
) -> StoreError {
    match code {
        Some("23505") => StoreError::Conflict(
            match constraint {
                "categories_name_key" => conflict::CATEGORY_NAME,
                "items_sku_key" => conflict::SKU,
                "users_email_key" => conflict::EMAIL,
                _ => "unique constraint violated",
            }
            .to_string(),
        ),
        Some("23503") => StoreError::Conflict(
            match (operation, constraint) {
                ("delete_category", _) => conflict::CATEGORY_IN_USE,
                ("delete_item", _) => conflict::ITEM_HAS_ENTRIES,
                (_, "items_category_id_fkey") => "Category does not exist",
                _ => "referenced row does not exist",
            }
            .to_string(),
        ),
        // numeric_value_out_of_range: stock + delta past BIGINT, or a price past NUMERIC(14, 2)
        Some("22003") => StoreError::Invalid(format!("value out of range in {}", operation)),
        _ => StoreError::Backend(format!("database error in {}: {}", operation, message)),
    }
}

/// LIMIT bound; `usize` values past `i64::MAX` mean "no limit".
fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn decode_entries(rows: &[PgRow]) -> StoreResult<Vec<LedgerEntry>> {
    rows.iter()
        .map(|row| {
            EntryRecord::from_row(row)
                .map_err(|e| map_sqlx_error("decode_entry", e))
                .and_then(LedgerEntry::try_from)
        })
        .collect()
}

fn decode_user(row: &PgRow) -> StoreResult<User> {
    UserRecord::from_row(row)
        .map_err(|e| map_sqlx_error("decode_user", e))
        .and_then(User::try_from)
}

// SQLx row types

#[derive(Debug)]
struct CategoryRecord {
    id: Uuid,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CategoryRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CategoryRecord {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl From<CategoryRecord> for Category {
    fn from(row: CategoryRecord) -> Self {
        Category {
            id: CategoryId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug)]
struct ItemRecord {
    id: Uuid,
    sku: String,
    name: String,
    description: Option<String>,
    category_id: Uuid,
    size: Option<String>,
    class: Option<String>,
    subject: Option<String>,
    cost_price: Decimal,
    sale_price: Decimal,
    stock: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ItemRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ItemRecord {
            id: row.try_get("id")?,
            sku: row.try_get("sku")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category_id: row.try_get("category_id")?,
            size: row.try_get("size")?,
            class: row.try_get("class")?,
            subject: row.try_get("subject")?,
            cost_price: row.try_get("cost_price")?,
            sale_price: row.try_get("sale_price")?,
            stock: row.try_get("stock")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ItemRecord> for Item {
    fn from(row: ItemRecord) -> Self {
        Item {
            id: ItemId::from_uuid(row.id),
            sku: row.sku,
            name: row.name,
            description: row.description,
            category_id: CategoryId::from_uuid(row.category_id),
            size: row.size,
            class: row.class,
            subject: row.subject,
            cost_price: row.cost_price,
            sale_price: row.sale_price,
            stock: row.stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug)]
struct EntryRecord {
    id: Uuid,
    item_id: Uuid,
    kind: String,
    quantity: i64,
    price: Option<Decimal>,
    reference: Option<String>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for EntryRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(EntryRecord {
            id: row.try_get("id")?,
            item_id: row.try_get("item_id")?,
            kind: row.try_get("kind")?,
            quantity: row.try_get("quantity")?,
            price: row.try_get("price")?,
            reference: row.try_get("reference")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<EntryRecord> for LedgerEntry {
    type Error = StoreError;

    fn try_from(row: EntryRecord) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<EntryKind>()
            .map_err(|e| StoreError::Backend(format!("corrupt ledger row {}: {e}", row.id)))?;
        Ok(LedgerEntry {
            id: EntryId::from_uuid(row.id),
            item_id: ItemId::from_uuid(row.item_id),
            kind,
            quantity: row.quantity,
            price: row.price,
            reference: row.reference,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug)]
struct UserRecord {
    id: Uuid,
    email: String,
    password_hash: String,
    name: Option<String>,
    role: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for UserRecord {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRecord {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            name: row.try_get("name")?,
            role: row.try_get("role")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<UserRecord> for User {
    type Error = StoreError;

    fn try_from(row: UserRecord) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| StoreError::Backend(format!("corrupt user row {}: {e}", row.id)))?;
        Ok(User {
            id: UserId::from_uuid(row.id),
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            role,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_declares_the_constraints_error_mapping_relies_on() {
        for name in [
            "categories_name_key",
            "items_sku_key",
            "users_email_key",
            "items_category_id_fkey",
            "ledger_entries_item_id_fkey",
            "CHECK (stock >= 0)",
            "ON DELETE RESTRICT",
            "school_single_row",
        ] {
            assert!(SCHEMA.contains(name), "schema is missing {name}");
        }
    }

    #[test]
    fn non_database_errors_are_backend_failures() {
        assert!(matches!(
            map_sqlx_error("connect", sqlx::Error::PoolClosed),
            StoreError::Backend(_)
        ));
        assert!(matches!(
            map_sqlx_error("get_item", sqlx::Error::RowNotFound),
            StoreError::Backend(_)
        ));
    }

    #[test]
    fn database_errors_map_by_sqlstate() {
        assert_eq!(
            map_database_error("insert_item", Some("23505"), "items_sku_key", "dup"),
            StoreError::Conflict(conflict::SKU.to_string())
        );
        assert_eq!(
            map_database_error("delete_category", Some("23503"), "items_category_id_fkey", "fk"),
            StoreError::Conflict(conflict::CATEGORY_IN_USE.to_string())
        );
        assert!(matches!(
            map_database_error("apply_movement", Some("22003"), "", "bigint out of range"),
            StoreError::Invalid(_)
        ));
        assert!(matches!(
            map_database_error("apply_movement", Some("40001"), "", "serialization"),
            StoreError::Backend(_)
        ));
    }

    #[test]
    fn oversized_limits_are_clamped() {
        assert_eq!(sql_limit(100), 100);
        assert_eq!(sql_limit(usize::MAX), i64::MAX);
    }
}
