//! Authentication middleware
//!
//! JWT authentication and role checks

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use shared::Role;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::auth::decode_token;
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub username: String,
    pub full_name: String,
    pub roles: Vec<Role>,
}

impl AuthUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    /// Fail unless the user is an admin
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }

    /// Fail unless the user owns the record or is an admin
    pub fn require_owner_or_admin(&self, owner_id: Uuid) -> AppResult<()> {
        if self.is_admin() || self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::InsufficientPermissions)
        }
    }

    /// User id to scope listings by; `None` for admins, who see everything
    pub fn scope(&self) -> Option<Uuid> {
        if self.is_admin() {
            None
        } else {
            Some(self.user_id)
        }
    }
}

/// Authentication middleware that validates JWT tokens
pub async fn auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    // Extract Authorization header
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        return AppError::Unauthorized {
            message: "Missing or invalid Authorization header".to_string(),
            message_es: "Falta el encabezado de autorización".to_string(),
        }
        .into_response();
    };

    let auth_user = match decode_token(token, &state.config.jwt.secret).and_then(AuthUser::try_from) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(auth_user);

    next.run(request).await
}

impl TryFrom<crate::services::auth::Claims> for AuthUser {
    type Error = AppError;

    fn try_from(claims: crate::services::auth::Claims) -> Result<Self, Self::Error> {
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidToken)?;
        Ok(AuthUser {
            user_id,
            username: claims.username,
            full_name: claims.full_name,
            roles: claims.roles.iter().filter_map(|r| Role::parse(r)).collect(),
        })
    }
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized {
                message: "Authentication required".to_string(),
                message_es: "Debe iniciar sesión".to_string(),
            })
    }
}
