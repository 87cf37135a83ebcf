use crate::error::DiscoveryError;
use crate::models::{MatchListQuery, MatchStatusQuery, UnmatchRequest, UserQuery};
use crate::routes::{validation_failed, AppState};
use actix_web::{web, HttpRequest, HttpResponse};
use uuid::Uuid;
use validator::Validate;

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    // `/matches/status` before `/matches/{id}` so it is not taken for an id
    cfg.route("/matches", web::get().to(list_matches))
        .route("/matches/status", web::get().to(match_status))
        .route("/matches/{id}", web::get().to(get_match))
        .route("/matches/{id}/unmatch", web::post().to(unmatch));
}

/// Active matches of a user, newest first
///
/// GET /api/v1/matches?userId={id}&page=1&limit=20
async fn list_matches(
    state: web::Data<AppState>,
    query: web::Query<MatchListQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, DiscoveryError> {
    if let Err(errors) = query.validate() {
        return Ok(validation_failed(req.path(), &errors));
    }

    let response = state
        .service
        .list_matches(&query.user_id, query.page, query.limit)
        .await?;
    Ok(HttpResponse::Ok().json(response))
}

/// GET /api/v1/matches/status?userId={id}&targetUserId={id}
async fn match_status(
    state: web::Data<AppState>,
    query: web::Query<MatchStatusQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, DiscoveryError> {
    if let Err(errors) = query.validate() {
        return Ok(validation_failed(req.path(), &errors));
    }

    let status = state
        .service
        .match_status(&query.user_id, &query.target_user_id)
        .await?;
    Ok(HttpResponse::Ok().json(status))
}

/// GET /api/v1/matches/{id}?userId={id}
async fn get_match(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<UserQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, DiscoveryError> {
    if let Err(errors) = query.validate() {
        return Ok(validation_failed(req.path(), &errors));
    }

    let match_id = parse_match_id(&path)?;
    let detail = state.service.get_match(match_id, &query.user_id).await?;
    Ok(HttpResponse::Ok().json(detail))
}

/// End a match on behalf of one of its users
///
/// POST /api/v1/matches/{id}/unmatch
///
/// Request body:
/// ```json
/// { "userId": "string" }
/// ```
async fn unmatch(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UnmatchRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, DiscoveryError> {
    if let Err(errors) = body.validate() {
        return Ok(validation_failed(req.path(), &errors));
    }

    let match_id = parse_match_id(&path)?;
    let response = state.service.unmatch(match_id, &body.user_id).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// A malformed id cannot reference any match
fn parse_match_id(raw: &str) -> Result<Uuid, DiscoveryError> {
    Uuid::parse_str(raw).map_err(|_| DiscoveryError::InvalidMatchReference(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_match_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_match_id(&id.to_string()).unwrap(), id);
        assert!(matches!(
            parse_match_id("not-a-uuid"),
            Err(DiscoveryError::InvalidMatchReference(_))
        ));
    }
}
