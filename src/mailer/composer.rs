use anyhow::Context;

use chrono::{DateTime, Utc};

use handlebars::Handlebars;

use serde_json::json;

use url::Url;

use crate::client::Email;
use crate::domain::{EmailAddress, Subscription, WeatherReading};
use crate::queue::NotificationJob;

const CONFIRMATION_SUBJECT: &str = "Weather updates confirmation link";
const CONFIRM_SUCCESS_SUBJECT: &str = "Weather updates subscription";
const WEATHER_UPDATE_SUBJECT: &str = "Weather Update";

const CONFIRMATION: &str = "confirmation";
const CONFIRM_SUCCESS: &str = "confirm_success";
const WEATHER_UPDATE: &str = "weather_update";

// Plain-text bodies use triple-stash so nothing gets HTML-escaped
const TEMPLATES: [(&str, &str, &str); 3] = [
    (
        CONFIRMATION,
        "<h1>Hello from Weather Updates!</h1>\
         <p>You subscribed for {{frequency}} updates for {{city}} weather.</p>\
         <p>Click <a href=\"{{link}}\">here</a> to confirm your subscription.</p>",
        "Hello from Weather Updates!\n\n\
         You subscribed for {{{frequency}}} updates for {{{city}}} weather.\n\
         To confirm your subscription, visit this web page: {{{link}}}",
    ),
    (
        CONFIRM_SUCCESS,
        "<h1>Your subscription is confirmed!</h1>\
         <p>You will receive {{frequency}} weather updates for {{city}}.</p>\
         <p>Changed your mind? <a href=\"{{link}}\">Unsubscribe</a>.</p>",
        "Your subscription is confirmed!\n\n\
         You will receive {{{frequency}}} weather updates for {{{city}}}.\n\
         To unsubscribe, visit this web page: {{{link}}}",
    ),
    (
        WEATHER_UPDATE,
        "<h1>Weather in {{city}}</h1>\
         <p>{{date}} at {{time}} UTC</p>\
         <ul>\
         <li>Temperature: {{temperature}}°C</li>\
         <li>Humidity: {{humidity}}%</li>\
         <li>Description: {{description}}</li>\
         </ul>\
         <p><a href=\"{{link}}\">Unsubscribe</a></p>",
        "Weather in {{{city}}}\n\
         {{{date}}} at {{{time}}} UTC\n\n\
         Temperature: {{{temperature}}}°C\n\
         Humidity: {{{humidity}}}%\n\
         Description: {{{description}}}\n\n\
         To unsubscribe, visit this web page: {{{link}}}",
    ),
];

/// Renders notification jobs into emails.
///
/// Links point at `<base_url>/api/confirm/<token>` and
/// `<base_url>/api/unsubscribe/<token>`. HTML bodies rely on handlebars
/// escaping for user supplied values.
#[derive(Clone)]
pub struct EmailComposer {
    base_url: Url,
    templates: Handlebars<'static>,
}

impl EmailComposer {
    pub fn new(base_url: Url) -> anyhow::Result<Self> {
        let mut templates = Handlebars::new();
        templates.set_strict_mode(true);

        for (name, html, text) in TEMPLATES {
            templates
                .register_template_string(&html_name(name), html)
                .with_context(|| format!("registering {} html template", name))?;
            templates
                .register_template_string(&text_name(name), text)
                .with_context(|| format!("registering {} text template", name))?;
        }

        Ok(Self {
            base_url,
            templates,
        })
    }

    /// Render the email for `job`, stamping weather updates with `now`
    pub fn compose(&self, job: &NotificationJob, now: DateTime<Utc>) -> anyhow::Result<Email> {
        let subscription = job.subscription();
        let recipient: EmailAddress = subscription
            .email
            .parse()
            .map_err(anyhow::Error::msg)
            .context("Subscription has an invalid email address")?;

        let (subject, template, context) = match job {
            NotificationJob::ConfirmationEmail { subscription } => (
                CONFIRMATION_SUBJECT,
                CONFIRMATION,
                self.subscription_context(subscription, "confirm")?,
            ),
            NotificationJob::ConfirmSuccessEmail { subscription } => (
                CONFIRM_SUCCESS_SUBJECT,
                CONFIRM_SUCCESS,
                self.subscription_context(subscription, "unsubscribe")?,
            ),
            NotificationJob::WeatherUpdateEmail {
                subscription,
                weather,
            } => (
                WEATHER_UPDATE_SUBJECT,
                WEATHER_UPDATE,
                self.weather_context(subscription, weather, now)?,
            ),
        };

        Ok(Email {
            recipient,
            subject: subject.into(),
            html_body: self.render(&html_name(template), &context)?,
            text_body: self.render(&text_name(template), &context)?,
        })
    }

    fn subscription_context(
        &self,
        s: &Subscription,
        action: &str,
    ) -> anyhow::Result<serde_json::Value> {
        Ok(json!({
            "city": s.city,
            "frequency": s.frequency,
            "link": self.link(action, &s.token)?.as_str(),
        }))
    }

    fn weather_context(
        &self,
        s: &Subscription,
        weather: &WeatherReading,
        now: DateTime<Utc>,
    ) -> anyhow::Result<serde_json::Value> {
        Ok(json!({
            "city": s.city,
            "date": now.format("%B %-d, %Y").to_string(),
            "time": now.format("%H:%M").to_string(),
            "temperature": format!("{:.1}", weather.temperature),
            "humidity": format!("{:.0}", weather.humidity),
            "description": weather.description,
            "link": self.link("unsubscribe", &s.token)?.as_str(),
        }))
    }

    fn render(&self, template: &str, context: &serde_json::Value) -> anyhow::Result<String> {
        self.templates
            .render(template, context)
            .with_context(|| format!("rendering {} template", template))
    }

    fn link(&self, action: &str, token: &str) -> anyhow::Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("{} cannot be used as a base URL", self.base_url))?
            .pop_if_empty()
            .extend(["api", action, token]);
        Ok(url)
    }
}

fn html_name(template: &str) -> String {
    format!("{}-html", template)
}

fn text_name(template: &str) -> String {
    format!("{}-text", template)
}
