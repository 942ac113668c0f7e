use warp::{reject::Rejection, Filter};

use crate::error::ErrorKind;

use super::jwt::{SessionData, SessionKeys};

/// Accepts both `Token <t>` and `Bearer <t>`.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    match scheme {
        "Token" | "Bearer" if !token.is_empty() => Some(token),
        _ => None,
    }
}

pub fn with_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let keys = keys.clone();
        async move {
            let token = header
                .as_deref()
                .and_then(bearer_token)
                .ok_or_else(|| ErrorKind::Unauthorized.default())?;

            keys.verify_jwt_session(token)
                .map(SessionData::from)
                .map_err(Rejection::from)
        }
    })
}

/// Invalid or missing tokens yield an anonymous caller instead of a rejection.
pub fn with_possible_session(
    keys: SessionKeys,
) -> impl Filter<Extract = (Option<SessionData>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization").map(move |header: Option<String>| {
        header
            .as_deref()
            .and_then(bearer_token)
            .and_then(|token| keys.verify_jwt_session(token).ok())
            .map(SessionData::from)
    })
}
