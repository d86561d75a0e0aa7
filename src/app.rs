use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use tracing_actix_web::TracingLogger;

use crate::controller::{subscriptions, weather};
use crate::service::SubscriptionService;
use crate::weather::WeatherSource;

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("I am alive")
}

/// Run the application on a specified TCP listener
pub fn run(
    listener: TcpListener,
    service: Arc<SubscriptionService>,
    weather_source: Arc<dyn WeatherSource>,
) -> anyhow::Result<Server> {
    // Wrap application data
    let service = web::Data::from(service);
    let weather_source: web::Data<dyn WeatherSource> = web::Data::from(weather_source);

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(service.clone())
            .app_data(weather_source.clone())
            .service(health_check)
            .service(
                web::scope("/api")
                    .service(subscriptions::services())
                    .service(weather::services()),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
