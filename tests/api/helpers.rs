use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;

use chrono::Utc;

use reqwest::{Client, Method, Response};

use secrecy::Secret;

use serde::Serialize;

use url::Url;

use weather_notify::app;
use weather_notify::client::Email;
use weather_notify::crypto::SigningKey;
use weather_notify::domain::WeatherReading;
use weather_notify::mailer::EmailComposer;
use weather_notify::queue::{InMemoryBroker, JobQueues, MessageBroker, NotificationJob, NotificationPublisher};
use weather_notify::repo::InMemorySubscriptionRepo;
use weather_notify::service::SubscriptionService;
use weather_notify::weather::{WeatherError, WeatherSource};

#[derive(Debug, Clone, Serialize)]
pub struct NewSubscriber {
    pub email: Option<String>,
    pub city: Option<String>,
    pub frequency: Option<String>,
}

impl NewSubscriber {
    pub fn new(email: &str, city: &str, frequency: &str) -> Self {
        Self {
            email: Some(email.into()),
            city: Some(city.into()),
            frequency: Some(frequency.into()),
        }
    }
}

/// Weather for a fixed set of cities
pub struct StubWeather {
    cities: HashMap<&'static str, Result<WeatherReading, WeatherError>>,
}

impl Default for StubWeather {
    fn default() -> Self {
        let cities = HashMap::from([
            ("Kyiv", Ok(kyiv_weather())),
            ("Broken", Err(WeatherError::Upstream("timed out".into()))),
        ]);
        Self { cities }
    }
}

#[async_trait::async_trait]
impl WeatherSource for StubWeather {
    async fn get_weather(&self, city: &str) -> Result<WeatherReading, WeatherError> {
        self.cities
            .get(city)
            .cloned()
            .unwrap_or(Err(WeatherError::CityNotFound))
    }
}

pub fn kyiv_weather() -> WeatherReading {
    WeatherReading {
        temperature: 4.5,
        humidity: 87.0,
        description: "Mist".into(),
    }
}

pub struct TestApp {
    addr: String,

    pub client: Client,
    pub repo: Arc<InMemorySubscriptionRepo>,
    pub broker: Arc<InMemoryBroker>,
    pub queues: JobQueues,
}

impl TestApp {
    pub async fn spawn() -> Self {
        use rand::{distributions::Alphanumeric, Rng};

        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to listen on random port");
        let port = listener.local_addr().unwrap().port();

        let addr = format!("http://127.0.0.1:{}", port);

        let signing_key = {
            let rand_key: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(32)
                .map(char::from)
                .collect();

            SigningKey::new(&Secret::new(rand_key)).expect("Failed to create crypto signing key")
        };

        let repo = Arc::new(InMemorySubscriptionRepo::new());
        let broker = Arc::new(InMemoryBroker::new());
        let queues = JobQueues::default();
        for queue in queues.all() {
            broker
                .declare_queue(queue)
                .await
                .expect("Failed to declare queue");
        }

        let weather: Arc<dyn WeatherSource> = Arc::new(StubWeather::default());
        let service = Arc::new(SubscriptionService::new(
            weather.clone(),
            repo.clone(),
            NotificationPublisher::new(broker.clone(), queues.clone()),
            signing_key,
        ));

        let server = app::run(listener, service, weather).expect("Failed to spawn app instance");
        let _ = tokio::spawn(server);

        Self {
            addr,
            client: Client::new(),
            repo,
            broker,
            queues,
        }
    }

    pub fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", &self.addr, url);
        self.client.request(method, url)
    }

    pub async fn health_check(&self) -> reqwest::Result<Response> {
        self.request(Method::GET, "health_check").send().await
    }

    pub async fn subscribe_form(&self, new_subscriber: &NewSubscriber) -> reqwest::Result<Response> {
        self.request(Method::POST, "api/subscribe")
            .form(new_subscriber)
            .send()
            .await
    }

    pub async fn subscribe_json(&self, new_subscriber: &NewSubscriber) -> reqwest::Result<Response> {
        self.request(Method::POST, "api/subscribe")
            .json(new_subscriber)
            .send()
            .await
    }

    pub async fn weather(&self, city: Option<&str>) -> reqwest::Result<Response> {
        let mut req = self.request(Method::GET, "api/weather");
        if let Some(city) = city {
            req = req.query(&[("city", city)]);
        }
        req.send().await
    }

    /// Jobs waiting on the email queue
    pub async fn email_jobs(&self) -> Vec<NotificationJob> {
        self.broker
            .queued(&self.queues.email)
            .await
            .iter()
            .map(|d| NotificationJob::decode(&d.payload).expect("Failed to decode queued job"))
            .collect()
    }

    /// Render a queued job the way the mail worker would, linking back to this app
    pub fn render(&self, job: &NotificationJob) -> Email {
        let base_url = Url::parse(&self.addr).expect("Failed to parse app address");
        EmailComposer::new(base_url)
            .expect("Failed to register email templates")
            .compose(job, Utc::now())
            .expect("Failed to compose email")
    }
}

/// The single link in a plain-text email body
pub fn extract_email_link(body: &str) -> String {
    let links: Vec<_> = linkify::LinkFinder::new()
        .links(body)
        .filter(|l| *l.kind() == linkify::LinkKind::Url)
        .collect();
    assert_eq!(1, links.len(), "Expected exactly one link in {}", body);
    links[0].as_str().to_owned()
}
