use super::{AppError, auth::AuthCtx};
use axum::response::Response;
use axum::{
    extract::OriginalUri,
    http::{Method, Request},
    middleware::Next,
};
use habitstar_shared::auth::Role;
use habitstar_shared::jwt::JwtClaims;
use percent_encoding::percent_decode_str;

pub async fn enforce_acl(req: Request<axum::body::Body>, next: Next) -> Result<Response, AppError> {
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|orig| orig.0.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().clone();
    let Some(auth) = req.extensions().get::<AuthCtx>() else {
        return Err(AppError::unauthorized());
    };
    let claims = &auth.claims;

    if let Err(err) = decide(&method, &path, claims) {
        tracing::warn!(
            method = %method,
            path = %path,
            user_id = %claims.sub,
            role = ?claims.role,
            token_child = ?claims.child_id,
            "ACL: no rule matched; denying"
        );
        return Err(err);
    }

    Ok(next.run(req).await)
}

fn decide(method: &Method, path: &str, claims: &JwtClaims) -> Result<(), AppError> {
    let segs = segmented(path);
    let Some(rest) = segs.strip_prefix(&["api", "v1"][..]) else {
        return Err(AppError::forbidden());
    };
    match claims.role {
        Role::Parent => allow_parent(method, rest),
        Role::Child => allow_child(method, rest, claims),
    }
}

fn allow_parent(method: &Method, rest: &[&str]) -> Result<(), AppError> {
    let get = *method == Method::GET;
    let post = *method == Method::POST;
    let put = *method == Method::PUT;
    let delete = *method == Method::DELETE;
    match rest {
        ["auth", "session"] if get => Ok(()),
        ["auth", "logout"] if post => Ok(()),
        ["dashboard"] | ["events"] if get => Ok(()),
        ["settings"] if get || put => Ok(()),
        ["children"] if get || post => Ok(()),
        ["children", _] if put || delete => Ok(()),
        ["children", _, "play"] if get || post => Ok(()),
        ["children", _, "rewards"] if get => Ok(()),
        ["children", _, "reset-progress" | "reset-rewards"] if post => Ok(()),
        ["children", _, "completions", "today"] if get => Ok(()),
        ["children", _, "stats", "weekly"] if get => Ok(()),
        ["children", _, "tasks", _, "complete"] if post => Ok(()),
        ["tasks"] if get || post => Ok(()),
        ["tasks", "templates"] if get => Ok(()),
        ["tasks", "templates", idx] if post && idx.parse::<usize>().is_ok() => Ok(()),
        ["tasks", id] if (put || delete) && *id != "templates" => Ok(()),
        _ => Err(AppError::forbidden()),
    }
}

/// Play-mode tokens: only the play surface of the bound child.
fn allow_child(method: &Method, rest: &[&str], claims: &JwtClaims) -> Result<(), AppError> {
    let get = *method == Method::GET;
    let post = *method == Method::POST;
    match rest {
        ["auth", "session"] if get => Ok(()),
        ["auth", "logout"] if post => Ok(()),
        ["events"] if get => Ok(()),
        ["children", child, "play"] if get => ensure_child(claims, child),
        ["children", child, "rewards"] if get => ensure_child(claims, child),
        ["children", child, "completions", "today"] if get => ensure_child(claims, child),
        ["children", child, "tasks", _, "complete"] if post => ensure_child(claims, child),
        _ => Err(AppError::forbidden()),
    }
}

fn segmented(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn decode(seg: &str) -> String {
    percent_decode_str(seg).decode_utf8_lossy().to_string()
}

fn ensure_child(claims: &JwtClaims, seg: &str) -> Result<(), AppError> {
    let expected = claims.child_id.as_ref().ok_or_else(AppError::forbidden)?;
    let provided = decode(seg);
    if expected == &provided {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parent() -> JwtClaims {
        JwtClaims {
            sub: "p1".into(),
            name: "Pat".into(),
            jti: "j".into(),
            exp: 0,
            role: Role::Parent,
            child_id: None,
        }
    }

    fn player(child: &str) -> JwtClaims {
        JwtClaims {
            role: Role::Child,
            child_id: Some(child.into()),
            ..parent()
        }
    }

    fn allowed(method: Method, path: &str, claims: &JwtClaims) -> bool {
        decide(&method, path, claims).is_ok()
    }

    #[test]
    fn parent_reaches_management_routes() {
        let p = parent();
        assert!(allowed(Method::GET, "/api/v1/dashboard", &p));
        assert!(allowed(Method::POST, "/api/v1/children", &p));
        assert!(allowed(Method::DELETE, "/api/v1/children/c1", &p));
        assert!(allowed(Method::POST, "/api/v1/children/c1/reset-progress", &p));
        assert!(allowed(Method::POST, "/api/v1/children/c1/play", &p));
        assert!(allowed(Method::GET, "/api/v1/children/c1/stats/weekly", &p));
        assert!(allowed(Method::PUT, "/api/v1/settings", &p));
        assert!(allowed(Method::POST, "/api/v1/tasks/templates/3", &p));
        assert!(allowed(Method::PUT, "/api/v1/tasks/t1", &p));
    }

    #[test]
    fn parent_rules_are_method_sensitive() {
        let p = parent();
        assert!(!allowed(Method::DELETE, "/api/v1/settings", &p));
        assert!(!allowed(Method::GET, "/api/v1/children/c1/reset-rewards", &p));
        assert!(!allowed(Method::POST, "/api/v1/tasks/templates/x", &p));
        assert!(!allowed(Method::DELETE, "/api/v1/tasks/templates", &p));
        assert!(!allowed(Method::GET, "/api/v2/dashboard", &p));
    }

    #[test]
    fn play_token_is_limited_to_its_child() {
        let c = player("kid 1");
        assert!(allowed(Method::GET, "/api/v1/children/kid%201/play", &c));
        assert!(allowed(Method::GET, "/api/v1/children/kid%201/rewards", &c));
        assert!(allowed(
            Method::POST,
            "/api/v1/children/kid%201/tasks/t1/complete",
            &c
        ));
        assert!(allowed(
            Method::GET,
            "/api/v1/children/kid%201/completions/today",
            &c
        ));
        assert!(allowed(Method::GET, "/api/v1/auth/session", &c));
        assert!(allowed(Method::GET, "/api/v1/events", &c));

        assert!(!allowed(Method::GET, "/api/v1/children/other/play", &c));
        assert!(!allowed(
            Method::POST,
            "/api/v1/children/other/tasks/t1/complete",
            &c
        ));
    }

    #[test]
    fn play_token_cannot_manage() {
        let c = player("kid");
        for (m, p) in [
            (Method::GET, "/api/v1/dashboard"),
            (Method::GET, "/api/v1/children"),
            (Method::POST, "/api/v1/children/kid/play"),
            (Method::POST, "/api/v1/children/kid/reset-progress"),
            (Method::POST, "/api/v1/children/kid/reset-rewards"),
            (Method::GET, "/api/v1/children/kid/stats/weekly"),
            (Method::DELETE, "/api/v1/children/kid"),
            (Method::GET, "/api/v1/tasks"),
            (Method::PUT, "/api/v1/settings"),
        ] {
            assert!(!allowed(m.clone(), p, &c), "{m} {p} should be denied");
        }
    }
}
