use reqwest::{Method, StatusCode};

use weather_notify::domain::Frequency;
use weather_notify::queue::NotificationJob;

use crate::helpers::{extract_email_link, NewSubscriber, TestApp};

#[tokio::test]
async fn subscribe_returns_ok_for_valid_form() {
    let app = TestApp::spawn().await;

    let res = app
        .subscribe_form(&NewSubscriber::new("test@test.com", "Kyiv", "daily"))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());

    let stored = app.repo.all().await;
    assert_eq!(1, stored.len());
    assert_eq!("test@test.com", stored[0].email);
    assert_eq!("Kyiv", stored[0].city);
    assert_eq!(Frequency::Daily, stored[0].frequency);
    assert!(!stored[0].confirmed);
}

#[tokio::test]
async fn subscribe_accepts_json() {
    let app = TestApp::spawn().await;

    let res = app
        .subscribe_json(&NewSubscriber::new("test@test.com", "Kyiv", "hourly"))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(Frequency::Hourly, app.repo.all().await[0].frequency);
}

#[tokio::test]
async fn subscribe_queues_a_confirmation_email() {
    let app = TestApp::spawn().await;

    app.subscribe_form(&NewSubscriber::new("test@test.com", "Kyiv", "daily"))
        .await
        .expect("Failed to execute request");

    let jobs = app.email_jobs().await;
    assert_eq!(1, jobs.len());

    let token = &app.repo.all().await[0].token;
    match &jobs[0] {
        NotificationJob::ConfirmationEmail { subscription } => {
            assert_eq!(token, &subscription.token)
        }
        other => panic!("Unexpected job queued: {:?}", other),
    }
}

#[tokio::test]
async fn subscribe_returns_bad_request_for_invalid_data() {
    let app = TestApp::spawn().await;

    let test_cases = vec![
        (
            "missing email",
            NewSubscriber {
                email: None,
                ..NewSubscriber::new("", "Kyiv", "daily")
            },
        ),
        (
            "missing city",
            NewSubscriber {
                city: None,
                ..NewSubscriber::new("test@test.com", "", "daily")
            },
        ),
        (
            "missing frequency",
            NewSubscriber {
                frequency: None,
                ..NewSubscriber::new("test@test.com", "Kyiv", "")
            },
        ),
        (
            "malformed email",
            NewSubscriber::new("bad email address", "Kyiv", "daily"),
        ),
        ("blank city", NewSubscriber::new("test@test.com", "  ", "daily")),
        (
            "unknown frequency",
            NewSubscriber::new("test@test.com", "Kyiv", "weekly"),
        ),
    ];

    for (desc, new_subscriber) in test_cases {
        let res = app
            .subscribe_form(&new_subscriber)
            .await
            .expect("Failed to execute request");

        assert_eq!(
            StatusCode::BAD_REQUEST,
            res.status(),
            "API did not fail with 400 when payload was {}",
            desc
        );
    }
    assert!(app.repo.all().await.is_empty());
}

#[tokio::test]
async fn subscribe_returns_not_found_for_unknown_city() {
    let app = TestApp::spawn().await;

    let res = app
        .subscribe_form(&NewSubscriber::new("test@test.com", "Atlantis", "daily"))
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::NOT_FOUND, res.status());
    assert!(app.email_jobs().await.is_empty());
}

#[tokio::test]
async fn subscribe_twice_returns_conflict() {
    let app = TestApp::spawn().await;
    let new_subscriber = NewSubscriber::new("test@test.com", "Kyiv", "daily");

    let first = app
        .subscribe_form(&new_subscriber)
        .await
        .expect("Failed to execute request");
    let second = app
        .subscribe_form(&new_subscriber)
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, first.status());
    assert_eq!(StatusCode::CONFLICT, second.status());
    assert_eq!("Email already subscribed", second.text().await.unwrap());
    assert_eq!(1, app.email_jobs().await.len());
}

#[tokio::test]
async fn subscription_can_be_confirmed_through_email_link() {
    let app = TestApp::spawn().await;

    app.subscribe_form(&NewSubscriber::new("test@test.com", "Kyiv", "daily"))
        .await
        .expect("Failed to execute request");

    let email = app.render(&app.email_jobs().await[0]);
    let link = extract_email_link(&email.text_body);

    let res = app
        .client
        .get(&link)
        .send()
        .await
        .expect("Failed to follow confirmation link");

    assert_eq!(StatusCode::OK, res.status());
    assert!(app.repo.all().await[0].confirmed);

    let jobs = app.email_jobs().await;
    assert_eq!(2, jobs.len());
    assert!(matches!(jobs[1], NotificationJob::ConfirmSuccessEmail { .. }));
}

#[tokio::test]
async fn subscription_can_be_cancelled_through_email_link() {
    let app = TestApp::spawn().await;

    app.subscribe_form(&NewSubscriber::new("test@test.com", "Kyiv", "daily"))
        .await
        .expect("Failed to execute request");
    let token = app.repo.all().await[0].token.clone();
    app.request(Method::GET, &format!("api/confirm/{}", token))
        .send()
        .await
        .expect("Failed to confirm subscription");

    let success = app.render(&app.email_jobs().await[1]);
    let link = extract_email_link(&success.text_body);

    let res = app
        .client
        .get(&link)
        .send()
        .await
        .expect("Failed to follow unsubscribe link");
    assert_eq!(StatusCode::OK, res.status());
    assert!(app.repo.all().await.is_empty());

    let again = app
        .client
        .get(&link)
        .send()
        .await
        .expect("Failed to follow unsubscribe link");
    assert_eq!(StatusCode::NOT_FOUND, again.status());
}

#[tokio::test]
async fn invalid_tokens_are_not_found() {
    let app = TestApp::spawn().await;

    for path in [
        "api/confirm/not-a-token",
        "api/confirm/eyJzdWIiOiIxIn0.c2lnbmF0dXJl",
        "api/unsubscribe/not-a-token",
    ] {
        let res = app
            .request(Method::GET, path)
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(StatusCode::NOT_FOUND, res.status(), "path was {}", path);
    }
}

#[tokio::test]
async fn blank_token_is_a_bad_request() {
    let app = TestApp::spawn().await;

    let res = app
        .request(Method::GET, "api/confirm/%20")
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_REQUEST, res.status());
}
