use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::types::AuthContext;
use crate::shared::{AppError, AppState, ErrorCode};

/// JWT authentication middleware - validates the Authorization Bearer header and adds
/// an AuthContext to the request.
/// Usage: .layer(middleware::from_fn_with_state(app_state.clone(), auth::jwt_auth))
/// Handlers can then extract Extension(auth): Extension<AuthContext>.
#[instrument(skip(state, req, next), fields(uri = %req.uri()))]
pub async fn jwt_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header in request");
            AppError::Unauthorized(ErrorCode::NoTokenProvided)
        })?
        .to_string();

    let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Invalid Authorization header format (expected Bearer token)");
        AppError::Unauthorized(ErrorCode::NoTokenProvided)
    })?;

    let claims = match state.token_config.validate_token(token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("JWT authentication failed: {}", e);
            return Err(e);
        }
    };

    let context = AuthContext::from_claims(&claims, auth_header.as_str());
    debug!(user_id = %context.user_id, "Authentication successful, adding context to request");

    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}
