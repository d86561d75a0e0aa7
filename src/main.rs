use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use sqlx::PgPool;

use weather_notify::app;
use weather_notify::cache::RedisCache;
use weather_notify::client::{self, OpenWeatherGeocoder, OpenWeatherProvider, WeatherApiProvider};
use weather_notify::crypto::SigningKey;
use weather_notify::queue::{MessageBroker, NotificationPublisher, RedisStreamBroker};
use weather_notify::repo::PgSubscriptionRepo;
use weather_notify::scheduler::BroadcastScheduler;
use weather_notify::service::SubscriptionService;
use weather_notify::settings::Settings;
use weather_notify::telemetry;
use weather_notify::weather::{WeatherCache, WeatherFallbackChain, WeatherSource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init("info")?;

    let settings = Settings::load()?;

    let pool = PgPool::connect_with(settings.database.with_db())
        .await
        .context("Failed to connect to Postgres")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let redis = settings.redis.connect().await?;

    // Queues
    let queues = settings.queue.queues();
    let broker = Arc::new(RedisStreamBroker::new(redis.clone(), settings.queue.group()));
    for queue in queues.all() {
        broker.declare_queue(queue).await?;
    }
    let publisher = NotificationPublisher::new(broker, queues);

    // Weather: cache in front of primary provider, then fallback
    let http = client::http_client(settings.weather.timeout())?;
    let weather_api = &settings.weather.weather_api;
    let open_weather = &settings.weather.open_weather;
    let geocoder = Arc::new(OpenWeatherGeocoder::new(
        http.clone(),
        open_weather.base_url()?,
        open_weather.api_key(),
    ));
    let chain = WeatherFallbackChain::new(Arc::new(WeatherApiProvider::new(
        http.clone(),
        weather_api.base_url()?,
        weather_api.api_key(),
    )))
    .with_fallback(Arc::new(OpenWeatherProvider::new(
        http,
        open_weather.base_url()?,
        open_weather.api_key(),
        geocoder,
    )));
    let weather: Arc<dyn WeatherSource> = Arc::new(
        WeatherCache::new(Arc::new(RedisCache::new(redis)), Arc::new(chain))
            .with_ttl(settings.weather.cache_ttl()),
    );

    let service = Arc::new(
        SubscriptionService::new(
            weather.clone(),
            Arc::new(PgSubscriptionRepo::new(pool)),
            publisher,
            SigningKey::new(settings.app.secret_key())?,
        )
        .with_broadcast_concurrency(settings.scheduler.broadcast_concurrency()),
    );

    BroadcastScheduler::new(service.clone(), settings.scheduler.daily_hour()?).spawn();

    let listener = TcpListener::bind(settings.app.addr())?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    app::run(listener, service, weather)?
        .await
        .context("Failed to run app")
}
