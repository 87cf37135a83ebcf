use crate::error::DiscoveryError;
use crate::models::CardsQuery;
use crate::routes::{validation_failed, AppState};
use actix_web::{web, HttpRequest, HttpResponse};
use validator::Validate;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/discovery/cards", web::get().to(get_cards))
        .route("/discovery/next", web::get().to(get_next_card));
}

/// Ranked discovery cards
///
/// GET /api/v1/discovery/cards?userId={id}&limit=10&excludeUserIds=a,b
async fn get_cards(
    state: web::Data<AppState>,
    query: web::Query<CardsQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, DiscoveryError> {
    if let Err(errors) = query.validate() {
        return Ok(validation_failed(req.path(), &errors));
    }

    let response = state
        .service
        .next_cards(&query.user_id, query.limit.map(usize::from), query.excluded())
        .await?;

    Ok(HttpResponse::Ok().json(response))
}

/// Single best card, `{"card": null}` when the pool is empty
///
/// GET /api/v1/discovery/next?userId={id}
async fn get_next_card(
    state: web::Data<AppState>,
    query: web::Query<crate::models::UserQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, DiscoveryError> {
    if let Err(errors) = query.validate() {
        return Ok(validation_failed(req.path(), &errors));
    }

    let card = state.service.next_card(&query.user_id).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "card": card })))
}
