use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpResponse, Responder};

use serde::Deserialize;

use crate::error::{RestError, RestResult};
use crate::service::SubscriptionService;

/// Subscription request, accepted as JSON or as a URL-encoded form
#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    email: Option<String>,
    city: Option<String>,
    frequency: Option<String>,
}

fn required(value: Option<String>, field: &str) -> RestResult<String> {
    value.ok_or_else(|| RestError::BadRequest(format!("Missing {}", field)))
}

type SubscribePayload = web::Either<web::Json<SubscribeBody>, web::Form<SubscribeBody>>;

/// Subscribe an email to weather updates for a city
#[tracing::instrument(name = "Create a new subscription", skip(service, payload))]
#[post("/subscribe")]
async fn subscribe(
    service: web::Data<SubscriptionService>,
    payload: SubscribePayload,
) -> RestResult<impl Responder> {
    let body = match payload {
        web::Either::Left(json) => json.into_inner(),
        web::Either::Right(form) => form.into_inner(),
    };
    let email = required(body.email, "email")?;
    let city = required(body.city, "city")?;
    let frequency = required(body.frequency, "frequency")?;

    service.subscribe(&email, &city, &frequency).await?;

    Ok(HttpResponse::Ok().body("Subscription successful. Confirmation email sent."))
}

/// Subscription confirmation endpoint
#[tracing::instrument(name = "Confirm a subscription by token", skip_all)]
#[get("/confirm/{token}")]
async fn confirm(
    service: web::Data<SubscriptionService>,
    path: web::Path<(String,)>,
) -> RestResult<impl Responder> {
    let (token,) = path.into_inner();

    service.confirm(&token).await?;

    Ok(HttpResponse::Ok().body("Subscription confirmed successfully"))
}

/// Unsubscribe endpoint, linked from every email after confirmation
#[tracing::instrument(name = "Unsubscribe by token", skip_all)]
#[get("/unsubscribe/{token}")]
async fn unsubscribe(
    service: web::Data<SubscriptionService>,
    path: web::Path<(String,)>,
) -> RestResult<impl Responder> {
    let (token,) = path.into_inner();

    service.unsubscribe(&token).await?;

    Ok(HttpResponse::Ok().body("Unsubscribed successfully"))
}

/// Subscription endpoints, mounted under the API scope
pub fn services() -> impl HttpServiceFactory {
    (subscribe, confirm, unsubscribe)
}
