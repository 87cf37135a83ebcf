use crate::error::DiscoveryError;
use crate::models::{SwipeRequest, UserQuery};
use crate::routes::{validation_failed, AppState};
use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/swipes/like", web::post().to(like))
        .route("/swipes/superlike", web::post().to(superlike))
        .route("/swipes/pass", web::post().to(pass))
        .route("/swipes/quota", web::get().to(quota))
        .route("/swipes/likers", web::get().to(likers));
}

/// Like a user
///
/// POST /api/v1/swipes/like
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "targetUserId": "string",
///   "score": 72.5
/// }
/// ```
async fn like(
    state: web::Data<AppState>,
    body: web::Json<SwipeRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, DiscoveryError> {
    if let Err(errors) = body.validate() {
        return Ok(validation_failed(req.path(), &errors));
    }

    let outcome = state
        .service
        .like(&body.user_id, &body.target_user_id, body.score)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Superlike a user, same body as `/swipes/like`
async fn superlike(
    state: web::Data<AppState>,
    body: web::Json<SwipeRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, DiscoveryError> {
    if let Err(errors) = body.validate() {
        return Ok(validation_failed(req.path(), &errors));
    }

    let outcome = state
        .service
        .superlike(&body.user_id, &body.target_user_id, body.score)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Pass on a user, same body as `/swipes/like`
async fn pass(
    state: web::Data<AppState>,
    body: web::Json<SwipeRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, DiscoveryError> {
    if let Err(errors) = body.validate() {
        return Ok(validation_failed(req.path(), &errors));
    }

    let outcome = state
        .service
        .pass(&body.user_id, &body.target_user_id, body.score)
        .await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Today's quota usage
///
/// GET /api/v1/swipes/quota?userId={id}
async fn quota(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, DiscoveryError> {
    if let Err(errors) = query.validate() {
        return Ok(validation_failed(req.path(), &errors));
    }

    let status = state.service.quota_status(&query.user_id).await?;
    Ok(HttpResponse::Ok().json(status))
}

/// Users whose like on the caller is still unanswered
///
/// GET /api/v1/swipes/likers?userId={id}
async fn likers(
    state: web::Data<AppState>,
    query: web::Query<UserQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, DiscoveryError> {
    if let Err(errors) = query.validate() {
        return Ok(validation_failed(req.path(), &errors));
    }

    let likers = state.service.likers(&query.user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "likers": likers,
        "count": likers.len(),
    })))
}
