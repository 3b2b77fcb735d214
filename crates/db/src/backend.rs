//! The data-service seam.
//!
//! [`DataBackend`] is the narrow interface the rest of the workspace uses to
//! reach storage: invoke a named procedure, or run a passthrough select.
//! [`PgBackend`] implements it over a Postgres pool, executing every call in
//! its own transaction with the caller's claims installed so row-level
//! policies apply.

use async_trait::async_trait;
use memcard_core::session::SessionIdentity;
use serde_json::Value;

use crate::error::DataError;
use crate::DbPool;

/// Storage operations, always performed on behalf of an (optional) caller.
#[async_trait]
pub trait DataBackend: Send + Sync {
    /// Invoke the stored procedure `procedure` with a JSON argument object.
    async fn rpc(
        &self,
        caller: Option<&SessionIdentity>,
        procedure: &str,
        args: Value,
    ) -> Result<Value, DataError>;

    /// Run a passthrough select. Rows come back in the order the service
    /// returns them.
    async fn select(
        &self,
        caller: Option<&SessionIdentity>,
        query: &Select,
    ) -> Result<Vec<Value>, DataError>;

    /// Cheap reachability check for health checks.
    async fn ping(&self) -> Result<(), DataError>;
}

// ---------------------------------------------------------------------------
// Select
// ---------------------------------------------------------------------------

/// Equality filter on a column. Values are compared as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub column: &'static str,
    pub ascending: bool,
}

/// A passthrough read against a single table.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    pub table: &'static str,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Select {
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            filters: Vec::new(),
            order: None,
            limit: None,
            offset: None,
        }
    }

    pub fn eq(mut self, column: &'static str, value: impl ToString) -> Self {
        self.filters.push(Filter {
            column,
            value: value.to_string(),
        });
        self
    }

    pub fn order_by(mut self, column: &'static str, ascending: bool) -> Self {
        self.order = Some(Order { column, ascending });
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Render the query as SQL with `$n` placeholders for filter values.
    ///
    /// Table and column names are restricted to lowercase identifiers.
    pub fn to_sql(&self) -> Result<String, DataError> {
        ensure_identifier(self.table)?;

        let mut sql = format!("SELECT row_to_json(t)::jsonb FROM (SELECT * FROM {}", self.table);
        for (i, filter) in self.filters.iter().enumerate() {
            ensure_identifier(filter.column)?;
            let keyword = if i == 0 { "WHERE" } else { "AND" };
            sql.push_str(&format!(" {keyword} {}::text = ${}", filter.column, i + 1));
        }
        if let Some(order) = &self.order {
            ensure_identifier(order.column)?;
            let direction = if order.ascending { "ASC" } else { "DESC" };
            sql.push_str(&format!(" ORDER BY {} {direction}", order.column));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit.max(0)));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset.max(0)));
        }
        sql.push_str(") t");
        Ok(sql)
    }
}

/// Accept only `[a-z_][a-z0-9_]*`.
pub fn ensure_identifier(name: &str) -> Result<(), DataError> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DataError::Invalid(format!("invalid identifier: {name:?}")))
    }
}

// ---------------------------------------------------------------------------
// PgBackend
// ---------------------------------------------------------------------------

/// [`DataBackend`] over a Postgres pool.
#[derive(Clone)]
pub struct PgBackend {
    pool: DbPool,
}

impl PgBackend {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Install the caller's claims and database role for the current
    /// transaction.
    async fn install_claims(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        caller: Option<&SessionIdentity>,
    ) -> Result<(), DataError> {
        let (claims, role_sql) = match caller {
            Some(identity) => (
                serde_json::json!({ "sub": identity.user_id, "role": "authenticated" }),
                "SET LOCAL ROLE authenticated",
            ),
            None => (serde_json::json!({ "role": "anon" }), "SET LOCAL ROLE anon"),
        };

        sqlx::query("SELECT set_config('request.jwt.claims', $1, true)")
            .bind(claims.to_string())
            .execute(&mut **tx)
            .await?;
        sqlx::query(role_sql).execute(&mut **tx).await?;
        Ok(())
    }
}

#[async_trait]
impl DataBackend for PgBackend {
    async fn rpc(
        &self,
        caller: Option<&SessionIdentity>,
        procedure: &str,
        args: Value,
    ) -> Result<Value, DataError> {
        ensure_identifier(procedure)?;

        let mut tx = self.pool.begin().await?;
        Self::install_claims(&mut tx, caller).await?;

        let sql = format!("SELECT public.{procedure}($1::jsonb)");
        let result: Value = sqlx::query_scalar(&sql)
            .bind(args)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result)
    }

    async fn select(
        &self,
        caller: Option<&SessionIdentity>,
        query: &Select,
    ) -> Result<Vec<Value>, DataError> {
        let sql = query.to_sql()?;

        let mut tx = self.pool.begin().await?;
        Self::install_claims(&mut tx, caller).await?;

        let mut q = sqlx::query_scalar::<_, Value>(&sql);
        for filter in &query.filters {
            q = q.bind(filter.value.clone());
        }
        let rows = q.fetch_all(&mut *tx).await?;

        tx.commit().await?;
        Ok(rows)
    }

    async fn ping(&self) -> Result<(), DataError> {
        crate::health_check(&self.pool).await?;
        Ok(())
    }
}
