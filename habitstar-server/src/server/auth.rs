use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::{Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{Duration, Utc};
use habitstar_shared::api;
use habitstar_shared::auth::Role;
use habitstar_shared::jwt::{self, JwtClaims};
use tracing::{error, info, warn};

use super::{AppError, AppState};

/// How many days of inactivity before a parent session is considered expired.
const USER_SESSION_IDLE_DAYS: i64 = 14;
/// How many days before mandatory re-login for parents.
const USER_TOKEN_TTL_DAYS: i64 = 30;
/// Play-mode tokens live for one day at most.
const PLAY_SESSION_IDLE_DAYS: i64 = 1;
const PLAY_TOKEN_TTL_DAYS: i64 = PLAY_SESSION_IDLE_DAYS;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_NAME_LEN: usize = 60;

#[derive(Clone, Debug)]
pub struct AuthCtx {
    pub claims: JwtClaims,
}

impl AuthCtx {
    /// Id of the parent account owning everything this token may touch.
    pub fn parent_id(&self) -> &str {
        &self.claims.sub
    }
}

pub async fn require_bearer(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let unauthorized = || Err(AppError::unauthorized());
    let header_val = match req.headers().get(header::AUTHORIZATION) {
        Some(v) => v,
        None => return unauthorized(),
    };
    let header_str = header_val.to_str().map_err(|_| AppError::unauthorized())?;
    let Some(token) = header_str.strip_prefix("Bearer ") else {
        return unauthorized();
    };

    let claims = match jwt::decode_and_verify(token, state.config.jwt_secret.as_bytes()) {
        Ok(c) => c,
        Err(e) => {
            warn!(error=%e, "auth: jwt decode failed");
            return unauthorized();
        }
    };

    validate_claims(&claims).map_err(|e| {
        warn!(error=?e, user_id=%claims.sub, "auth: validate_claims failed");
        AppError::unauthorized()
    })?;

    let jti = claims.jti.clone();
    let idle_days = match claims.role {
        Role::Parent => USER_SESSION_IDLE_DAYS,
        Role::Child => PLAY_SESSION_IDLE_DAYS,
    };
    let cutoff = Utc::now() - Duration::days(idle_days);
    match state
        .store
        .touch_session_with_cutoff(&jti, cutoff.naive_utc())
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            warn!(
                jti = %jti,
                user_id = %claims.sub,
                cutoff = %cutoff,
                idle_days = idle_days,
                "auth: session missing or expired (last_used_at < cutoff)"
            );
            return unauthorized();
        }
        Err(e) => {
            error!(jti = %jti, error=%e, "auth: touch_session_with_cutoff failed");
            return Err(AppError::internal(e));
        }
    }
    req.extensions_mut().insert(AuthCtx { claims });
    Ok(next.run(req).await)
}

/// Creates a session row and signs a token for it.
pub async fn issue_token(
    state: &AppState,
    user_id: &str,
    name: &str,
    role: Role,
    child_id: Option<String>,
) -> Result<String, AppError> {
    let jti = uuid::Uuid::new_v4().to_string();
    let ttl_days = match role {
        Role::Parent => USER_TOKEN_TTL_DAYS,
        Role::Child => PLAY_TOKEN_TTL_DAYS,
    };
    let exp = (Utc::now() + Duration::days(ttl_days)).timestamp();
    let claims = JwtClaims {
        sub: user_id.to_string(),
        name: name.to_string(),
        jti: jti.clone(),
        exp,
        role,
        child_id,
    };

    validate_claims(&claims)?;

    state.store.create_session(&jti, user_id).await.map_err(|e| {
        error!(user_id, error=%e, "login/register: create_session failed");
        AppError::internal(e)
    })?;
    let token = jwt::encode(&claims, state.config.jwt_secret.as_bytes()).map_err(|e| {
        error!(user_id, error=%e, "login/register: jwt encode failed");
        AppError::internal(e)
    })?;
    Ok(token)
}

fn validate_claims(claims: &JwtClaims) -> Result<(), AppError> {
    match (claims.role, claims.child_id.as_deref()) {
        (Role::Parent, None) => Ok(()),
        (Role::Parent, Some(_)) => {
            warn!(user_id = %claims.sub, "auth: parent token must not include a child");
            Err(AppError::forbidden())
        }
        (Role::Child, Some(c)) if !c.trim().is_empty() => Ok(()),
        (Role::Child, _) => {
            warn!(user_id = %claims.sub, "auth: play token missing child_id");
            Err(AppError::forbidden())
        }
    }
}

async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(AppError::internal)?
        .map_err(AppError::internal)
}

async fn verify_password(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(AppError::internal)?
        .map_err(AppError::internal)
}

fn validate_registration(body: &api::RegisterReq) -> Result<(), AppError> {
    let name = body.name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::bad_request("name must be 1-60 characters"));
    }
    let email = body.email.trim();
    if email.is_empty() || !email.contains('@') || email.contains(char::is_whitespace) {
        return Err(AppError::bad_request("invalid email"));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::bad_request(
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}

pub async fn api_auth_register(
    State(state): State<AppState>,
    Json(body): Json<api::RegisterReq>,
) -> Result<(StatusCode, Json<api::AuthResp>), AppError> {
    if !state.config.allow_registration {
        warn!("register: registration disabled");
        return Err(AppError::forbidden());
    }
    validate_registration(&body)?;
    let hash = hash_password(body.password.clone()).await?;
    let user = state
        .store
        .create_user(&body.name, &body.email, &hash)
        .await?;
    info!(user_id = %user.id, "register: parent account created");
    let token = issue_token(&state, &user.id, &user.name, Role::Parent, None).await?;
    Ok((StatusCode::CREATED, Json(api::AuthResp { token })))
}

pub async fn api_auth_login(
    State(state): State<AppState>,
    Json(body): Json<api::LoginReq>,
) -> Result<Json<api::AuthResp>, AppError> {
    let user = state
        .store
        .find_user_by_email(&body.email)
        .await?
        .ok_or_else(|| {
            warn!(email=%body.email, "login: unknown email");
            AppError::unauthorized()
        })?;
    if !verify_password(body.password, user.password_hash.clone()).await? {
        warn!(user_id=%user.id, "login: invalid password");
        return Err(AppError::unauthorized());
    }
    let token = issue_token(&state, &user.id, &user.name, Role::Parent, None).await?;
    Ok(Json(api::AuthResp { token }))
}

pub async fn api_auth_logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<StatusCode, AppError> {
    state.store.delete_session(&auth.claims.jti).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn api_auth_session(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<api::SessionDto>, AppError> {
    let user = state
        .store
        .get_user(auth.parent_id())
        .await?
        .ok_or_else(|| {
            warn!(user_id = %auth.parent_id(), "session: account no longer exists");
            AppError::unauthorized()
        })?;
    Ok(Json(api::SessionDto {
        user: api::SessionUserDto {
            id: user.id,
            name: user.name,
        },
        role: auth.claims.role,
        child_id: auth.claims.child_id,
    }))
}

/// Issues a play-mode token bound to one of the caller's children.
pub async fn api_play_token(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(id): Path<String>,
) -> Result<Json<api::PlayTokenResp>, AppError> {
    let child = state.store.get_child(auth.parent_id(), &id).await?;
    let token = issue_token(
        &state,
        auth.parent_id(),
        &auth.claims.name,
        Role::Child,
        Some(child.id.clone()),
    )
    .await?;
    info!(child_id = %child.id, "play: token issued");
    Ok(Json(api::PlayTokenResp {
        token,
        child_id: child.id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: Role, child_id: Option<&str>) -> JwtClaims {
        JwtClaims {
            sub: "p1".into(),
            name: "Pat".into(),
            jti: "j1".into(),
            exp: 0,
            role,
            child_id: child_id.map(str::to_string),
        }
    }

    #[test]
    fn claims_shape_matches_role() {
        assert!(validate_claims(&claims(Role::Parent, None)).is_ok());
        assert!(validate_claims(&claims(Role::Parent, Some("c1"))).is_err());
        assert!(validate_claims(&claims(Role::Child, Some("c1"))).is_ok());
        assert!(validate_claims(&claims(Role::Child, None)).is_err());
        assert!(validate_claims(&claims(Role::Child, Some(" "))).is_err());
    }

    #[test]
    fn registration_rules() {
        let ok = api::RegisterReq {
            name: "Pat".into(),
            email: "pat@example.com".into(),
            password: "hunter22".into(),
        };
        assert!(validate_registration(&ok).is_ok());

        let short = api::RegisterReq {
            password: "1234567".into(),
            ..ok.clone()
        };
        assert!(matches!(
            validate_registration(&short),
            Err(AppError::BadRequest(_))
        ));

        let bad_email = api::RegisterReq {
            email: "not-an-email".into(),
            ..ok.clone()
        };
        assert!(validate_registration(&bad_email).is_err());

        let blank = api::RegisterReq {
            name: "   ".into(),
            ..ok
        };
        assert!(validate_registration(&blank).is_err());
    }
}
