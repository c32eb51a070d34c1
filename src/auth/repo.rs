use crate::auth::repo_types::User;
use crate::plans::model::Member;
use sqlx::PgPool;
use uuid::Uuid;

impl User {
    /// Find a user by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, name, email, password_hash, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Every registered user; together they form the planning group.
    pub async fn list_members(db: &PgPool) -> anyhow::Result<Vec<Member>> {
        let rows = sqlx::query_as::<_, (Uuid, String, String)>(
            r#"
            SELECT id, name, email
            FROM users
            ORDER BY name ASC, id ASC
            "#,
        )
        .fetch_all(db)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(id, name, email)| Member { id, name, email })
            .collect())
    }
}
