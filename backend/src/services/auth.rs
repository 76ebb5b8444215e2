//! Authentication service for user registration, login, and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::{Role, User};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::AuthUser;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// Input for registering a user
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterUserInput {
    #[validate(length(min = 3, max = 30))]
    pub username: String,
    #[validate(length(min = 6, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    pub phone: Option<String>,
    pub roles: Option<Vec<Role>>,
}

/// Input for updating a user; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserInput {
    #[validate(length(min = 6, max = 128))]
    pub password: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub roles: Option<Vec<Role>>,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub username: String,
    pub full_name: String,
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Successful login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: User,
}

/// User row including the password hash
#[derive(Debug, sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

const USER_COLUMNS: &str = "id, username, full_name, phone, roles, is_active, created_at";

/// Usernames are stored trimmed and lowercased
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}

/// Decode and validate an access token
pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Register a new user (admin only)
    pub async fn register(&self, actor: &AuthUser, input: RegisterUserInput) -> AppResult<User> {
        actor.require_admin()?;
        input.validate()?;
        self.insert_user(input).await
    }

    async fn insert_user(&self, input: RegisterUserInput) -> AppResult<User> {
        let username = normalize_username(&input.username);
        shared::validate_username(&username).map_err(|m| AppError::validation("username", m))?;
        if let Some(phone) = &input.phone {
            shared::validate_phone(phone).map_err(|m| AppError::validation("phone", m))?;
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let roles: Vec<String> = input
            .roles
            .unwrap_or_else(|| vec![Role::User])
            .iter()
            .map(|r| r.as_str().to_string())
            .collect();

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash, full_name, phone, roles)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&username)
        .bind(&password_hash)
        .bind(input.full_name.trim())
        .bind(&input.phone)
        .bind(&roles)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Authenticate user with username and password
    pub async fn login(&self, username: &str, password: &str) -> AppResult<AuthResponse> {
        let row = sqlx::query_as::<_, CredentialRow>(&format!(
            "SELECT {}, password_hash FROM users WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(normalize_username(username))
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        if !row.user.is_active {
            return Err(AppError::Unauthorized {
                message: "Account is disabled".to_string(),
                message_es: "La cuenta está desactivada".to_string(),
            });
        }

        let valid = verify(password, &row.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let access_token = self.generate_token(&row.user)?;

        Ok(AuthResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
            user: row.user,
        })
    }

    /// Fetch a user by id
    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    /// List all users (admin only)
    pub async fn list_users(&self, actor: &AuthUser) -> AppResult<Vec<User>> {
        actor.require_admin()?;
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users ORDER BY full_name",
            USER_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    /// Update a user's profile, password or roles (admin only)
    pub async fn update_user(&self, actor: &AuthUser, user_id: Uuid, input: UpdateUserInput) -> AppResult<User> {
        actor.require_admin()?;
        input.validate()?;
        if let Some(phone) = &input.phone {
            shared::validate_phone(phone).map_err(|m| AppError::validation("phone", m))?;
        }

        let password_hash = match &input.password {
            Some(p) => Some(
                hash(p, DEFAULT_COST)
                    .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?,
            ),
            None => None,
        };
        let roles: Option<Vec<String>> = input
            .roles
            .map(|rs| rs.iter().map(|r| r.as_str().to_string()).collect());

        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                password_hash = COALESCE($2, password_hash),
                full_name = COALESCE($3, full_name),
                phone = COALESCE($4, phone),
                roles = COALESCE($5, roles)
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(password_hash)
        .bind(input.full_name.as_deref().map(str::trim))
        .bind(&input.phone)
        .bind(roles)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
    }

    /// Flip a user's active flag (admin only)
    pub async fn toggle_active(&self, actor: &AuthUser, user_id: Uuid) -> AppResult<User> {
        actor.require_admin()?;
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_active = NOT is_active WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;

        tracing::info!(user_id = %user.id, is_active = user.is_active, "User active flag changed");
        Ok(user)
    }

    /// Delete a user (admin only). Users referenced by sales or sessions cannot be deleted.
    pub async fn delete_user(&self, actor: &AuthUser, user_id: Uuid) -> AppResult<()> {
        actor.require_admin()?;
        if actor.user_id == user_id {
            return Err(AppError::validation("user_id", "You cannot delete your own account"));
        }
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User"));
        }
        Ok(())
    }

    /// Create the first admin account and a default warehouse on an empty database
    pub async fn seed(&self, admin_username: &str, admin_password: &str) -> AppResult<bool> {
        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        if users > 0 {
            return Ok(false);
        }

        self.insert_user(RegisterUserInput {
            username: admin_username.to_string(),
            password: admin_password.to_string(),
            full_name: "Administrador".to_string(),
            phone: None,
            roles: Some(vec![Role::Admin, Role::User]),
        })
        .await?;

        sqlx::query(
            r#"
            INSERT INTO warehouses (name)
            SELECT 'Almacén Principal'
            WHERE NOT EXISTS (SELECT 1 FROM warehouses)
            "#,
        )
        .execute(&self.db)
        .await?;

        tracing::info!(username = admin_username, "Seeded initial admin account");
        Ok(true)
    }

    /// Generate an access token for a user
    pub fn generate_token(&self, user: &User) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expiry);

        let claims = Claims {
            sub: user.id.to_string(),
            username: user.username.clone(),
            full_name: user.full_name.clone(),
            roles: user.roles.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_username() {
        assert_eq!(normalize_username("  Cajero1 "), "cajero1");
        assert_eq!(normalize_username("ADMIN"), "admin");
    }

    #[test]
    fn test_decode_token_rejects_garbage() {
        assert!(matches!(
            decode_token("not-a-token", "secret"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_token_round_trip_and_wrong_secret() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "cajero".to_string(),
            full_name: "Ana Cajera".to_string(),
            roles: vec!["user".to_string()],
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
            iat: Utc::now().timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        let decoded = decode_token(&token, "secret").unwrap();
        assert_eq!(decoded.username, "cajero");
        assert!(matches!(decode_token(&token, "other"), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_expired_token() {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            username: "cajero".to_string(),
            full_name: "Ana Cajera".to_string(),
            roles: vec![],
            exp: (Utc::now() - Duration::hours(2)).timestamp(),
            iat: (Utc::now() - Duration::hours(3)).timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(matches!(decode_token(&token, "secret"), Err(AppError::TokenExpired)));
    }
}
