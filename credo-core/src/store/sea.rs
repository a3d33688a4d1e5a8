use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Index};
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, Set, SqlErr,
};
use tokio::sync::OnceCell;

use super::{AccountStore, StoreError, store_now};
use crate::models::account::{self, Account, NewAccount, Role};

/// Name of the unique index on `accounts.email`.
pub const EMAIL_INDEX: &str = "idx_accounts_email";

/// Account store backed by a SeaORM connection (SQLite or PostgreSQL).
pub struct SeaOrmAccountStore {
    db: DatabaseConnection,
    email_index: OnceCell<()>,
}

impl SeaOrmAccountStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            email_index: OnceCell::new(),
        }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create the unique email index the first time the store is written to.
    ///
    /// Concurrent first callers wait on the same initialization; a failed
    /// attempt is retried by the next caller.
    async fn ensure_email_index(&self) -> Result<(), StoreError> {
        self.email_index
            .get_or_try_init(|| async {
                let stmt = Index::create()
                    .if_not_exists()
                    .name(EMAIL_INDEX)
                    .table(account::Entity)
                    .col(account::Column::Email)
                    .unique()
                    .to_owned();
                let backend = self.db.get_database_backend();
                self.db.execute(backend.build(&stmt)).await?;
                tracing::debug!(index = EMAIL_INDEX, "ensured unique email index");
                Ok::<(), DbErr>(())
            })
            .await?;
        Ok(())
    }
}

fn map_insert_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => StoreError::DuplicateEmail,
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl AccountStore for SeaOrmAccountStore {
    async fn find_by_id(&self, id: &str) -> Result<Account, StoreError> {
        account::Entity::find_by_id(id.to_string())
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<Account, StoreError> {
        account::Entity::find()
            .filter(account::Column::Email.eq(email.to_lowercase()))
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound)
    }

    async fn insert(&self, draft: NewAccount) -> Result<Account, StoreError> {
        self.ensure_email_index().await?;

        let active = account::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            name: Set(draft.name),
            email: Set(draft.email.to_lowercase()),
            password_digest: Set(draft.password_digest),
            role: Set(draft.role),
            verified: Set(draft.verified),
            verification_code: Set(None),
            password_reset_token: Set(None),
            password_reset_expires_at: Set(None),
            created_at: Set(draft.created_at),
            updated_at: Set(draft.updated_at),
        };

        active.insert(&self.db).await.map_err(map_insert_error)
    }

    async fn set_verification_code(&self, id: &str, code: &str) -> Result<(), StoreError> {
        let result = account::Entity::update_many()
            .col_expr(account::Column::VerificationCode, Expr::value(code))
            .col_expr(account::Column::UpdatedAt, Expr::value(store_now()))
            .filter(account::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_role(&self, id: &str, role: Role) -> Result<(), StoreError> {
        let result = account::Entity::update_many()
            .col_expr(account::Column::Role, Expr::value(role.to_value()))
            .col_expr(account::Column::UpdatedAt, Expr::value(store_now()))
            .filter(account::Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        email: &str,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = account::Entity::update_many()
            .col_expr(account::Column::PasswordResetToken, Expr::value(token))
            .col_expr(account::Column::PasswordResetExpiresAt, Expr::value(expires_at))
            .col_expr(account::Column::UpdatedAt, Expr::value(store_now()))
            .filter(account::Column::Email.eq(email.to_lowercase()))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn consume_verification_code(&self, code: &str) -> Result<u64, StoreError> {
        let result = account::Entity::update_many()
            .col_expr(account::Column::Verified, Expr::value(true))
            .col_expr(
                account::Column::VerificationCode,
                Expr::value(Option::<String>::None),
            )
            .col_expr(account::Column::UpdatedAt, Expr::value(store_now()))
            .filter(account::Column::VerificationCode.eq(code))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }

    async fn consume_reset_token(&self, token: &str, new_digest: &str) -> Result<u64, StoreError> {
        let now = store_now();
        let result = account::Entity::update_many()
            .col_expr(account::Column::PasswordDigest, Expr::value(new_digest))
            .col_expr(
                account::Column::PasswordResetToken,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                account::Column::PasswordResetExpiresAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .col_expr(account::Column::UpdatedAt, Expr::value(now))
            .filter(account::Column::PasswordResetToken.eq(token))
            .filter(account::Column::PasswordResetExpiresAt.gt(now))
            .exec(&self.db)
            .await?;

        Ok(result.rows_affected)
    }
}
