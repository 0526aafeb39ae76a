//! Caller-identity extractors.
//!
//! Token issuance and validation live in the platform's auth gateway, which
//! terminates authentication and forwards the verified identity as headers:
//! `X-User-Id` (required), `X-Tenant-Id` and `X-User-Role` (optional).
//! Requests reaching this service without those headers are unauthenticated.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use fileops_notify::RequestContext;

use crate::error::AppError;
use crate::state::AppState;

/// Role names recognised for elevated operations.
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const SERVICE: &str = "service";
}

/// Authenticated caller extracted from gateway identity headers.
///
/// Use this as an extractor parameter in any handler that requires
/// authentication:
///
/// ```ignore
/// async fn my_handler(auth: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = %auth.user_id, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub tenant_id: Option<Uuid>,
    /// Role name forwarded by the gateway (e.g. `"admin"`, `"member"`).
    pub role: String,
}

impl AuthUser {
    /// Whether the caller may hit notification-sending routes.
    pub fn is_elevated(&self) -> bool {
        self.role == roles::ADMIN || self.role == roles::SERVICE
    }
}

fn header_str<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts.headers.get(name).and_then(|v| v.to_str().ok())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user_id = header_str(parts, "x-user-id")
            .ok_or_else(|| AppError::Unauthorized("Missing X-User-Id header".into()))?
            .parse::<Uuid>()
            .map_err(|_| AppError::Unauthorized("Invalid X-User-Id header".into()))?;

        let tenant_id = header_str(parts, "x-tenant-id").and_then(|v| v.parse().ok());
        let role = header_str(parts, "x-user-role")
            .unwrap_or("member")
            .to_string();

        Ok(AuthUser {
            user_id,
            tenant_id,
            role,
        })
    }
}

/// Extractor that additionally requires an elevated role.
///
/// Rejects with 403 when the caller is authenticated but not elevated.
#[derive(Debug, Clone)]
pub struct RequireElevated(pub AuthUser);

impl FromRequestParts<AppState> for RequireElevated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        if !auth.is_elevated() {
            return Err(AppError::Forbidden(
                "Sending notifications requires an elevated role".into(),
            ));
        }
        Ok(RequireElevated(auth))
    }
}

/// Caller metadata for audit entries (client IP, user agent).
#[derive(Debug, Clone)]
pub struct ClientInfo(pub RequestContext);

impl FromRequestParts<AppState> for ClientInfo {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ip_address = header_str(parts, "x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string());
        let user_agent = header_str(parts, "user-agent").map(String::from);

        Ok(ClientInfo(RequestContext {
            ip_address,
            user_agent,
        }))
    }
}
