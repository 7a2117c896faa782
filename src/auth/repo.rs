use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// Account role: fixed by the route that created the account, never chosen
/// by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub created_at: OffsetDateTime,
}

impl User {
    /// Find a user by email, irrespective of role. Used by the signup
    /// duplicate check.
    pub async fn find_by_email(db: &PgPool, email: &str) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, phone, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
    }

    /// Find a user matching both email and role. Used by login.
    pub async fn find_by_email_and_role(
        db: &PgPool,
        email: &str,
        role: Role,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, phone, created_at
            FROM users
            WHERE email = $1 AND role = $2
            "#,
        )
        .bind(email)
        .bind(role)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, phone, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
    }

    /// Create a new user with a hashed password. The unique index on email
    /// backstops the duplicate pre-check.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
        phone: Option<&str>,
    ) -> sqlx::Result<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role, phone)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, password_hash, role, phone, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(phone)
        .fetch_one(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        assert_eq!(
            serde_json::to_string(&Role::Customer).unwrap(),
            "\"customer\""
        );
        assert_eq!(Role::Admin.as_str(), "admin");
    }

    #[test]
    fn user_never_serializes_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Alice".into(),
            email: "a@x.com".into(),
            password_hash: "$argon2id$not-for-the-wire".into(),
            role: Role::Customer,
            phone: None,
            created_at: OffsetDateTime::now_utc(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["email"], "a@x.com");
        assert_eq!(value["role"], "customer");
    }
}
