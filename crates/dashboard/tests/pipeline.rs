use std::{
    fs,
    net::TcpListener,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use lean_dashboard::{
    cookies::{CookieError, CookieJar}, two_factor::parse_code, Client, CodeError, Error, Region, Settings,
    USER_AGENT,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use url::Url;
use wiremock::{
    matchers::{body_json, header, header_exists, method, path},
    Mock, MockServer, ResponseTemplate,
};

// Fields are dropped in order; the server verifies its expectations when dropped.
struct Dashboard {
    server: MockServer,
    runtime: Runtime,
    config: TempDir,
}

impl Dashboard {
    fn start() -> Self {
        let runtime = Runtime::new().unwrap();
        let server = runtime.block_on(MockServer::start());
        Self {
            server,
            runtime,
            config: TempDir::new().unwrap(),
        }
    }

    fn mount(&self, mock: Mock) {
        self.runtime.block_on(mock.mount(&self.server));
    }

    fn url(&self) -> Url {
        Url::parse(&self.server.uri()).unwrap()
    }

    fn settings(&self) -> Settings {
        Settings::new(self.config.path()).with_dashboard(Some(self.server.uri()))
    }

    /// A client as a fresh process would create it.
    fn client(&self) -> Client {
        Client::by_region(self.settings(), Region::Cn)
            .unwrap()
            .with_code_source(|| -> Result<u32, CodeError> {
                panic!("No two-factor challenge was expected")
            })
    }

    fn cookie_file_exists(&self) -> bool {
        self.settings().cookie_path().exists()
    }
}

fn challenge() -> ResponseTemplate {
    ResponseTemplate::new(401).set_body_json(json!({"token": "abc"}))
}

#[test]
fn cookies_from_a_successful_call_are_sent_by_the_next_invocation() {
    let dashboard = Dashboard::start();
    dashboard.mount(
        Mock::given(method("GET"))
            .and(path("/1.1/clients/self"))
            .and(header("user-agent", USER_AGENT))
            .and(header_exists("x-xsrf-token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "XSRF-TOKEN=abc; Path=/")
                    .set_body_json(json!({"username": "someone"})),
            )
            .expect(1),
    );
    dashboard.mount(
        Mock::given(method("GET"))
            .and(path("/1.1/apps"))
            .and(header("x-xsrf-token", "abc"))
            .and(header("cookie", "XSRF-TOKEN=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1),
    );

    let me: Value = dashboard.client().get_json("/1.1/clients/self").unwrap();
    assert_eq!(me["username"], "someone");
    assert!(dashboard.cookie_file_exists());

    let apps: Vec<Value> = dashboard.client().get_json("/1.1/apps").unwrap();
    assert!(apps.is_empty());
}

#[test]
fn params_are_sent_as_json() {
    let dashboard = Dashboard::start();
    dashboard.mount(
        Mock::given(method("POST"))
            .and(path("/1.1/apps"))
            .and(body_json(json!({"name": "demo", "description": ""})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"app_id": "x1"})))
            .expect(1),
    );

    let created: Value = dashboard
        .client()
        .post_json("/1.1/apps", &json!({"name": "demo", "description": ""}))
        .unwrap();
    assert_eq!(created["app_id"], "x1");
}

#[test]
fn challenge_is_exchanged_once_and_its_response_returned() {
    let dashboard = Dashboard::start();
    dashboard.mount(
        Mock::given(method("GET"))
            .and(path("/1.1/apps"))
            .respond_with(challenge())
            .expect(1),
    );
    dashboard.mount(
        Mock::given(method("POST"))
            .and(path("/1.1/do2fa"))
            .and(body_json(json!({"token": "abc", "code": 123456})))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("set-cookie", "uluru_user=session; Path=/")
                    .set_body_json(json!({"username": "someone"})),
            )
            .expect(1),
    );

    let asked = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&asked);
    let client = Client::by_region(dashboard.settings(), Region::Us)
        .unwrap()
        .with_code_source(move || -> Result<u32, CodeError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(123456)
        });

    let response = client.get("/1.1/apps").unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<Value>().unwrap()["username"], "someone");
    assert_eq!(asked.load(Ordering::SeqCst), 1);

    let jar = CookieJar::open(dashboard.settings().cookie_path()).unwrap();
    assert_eq!(
        jar.get(&dashboard.url(), "uluru_user").as_deref(),
        Some("session")
    );
}

#[test]
fn non_numeric_code_is_rejected_without_contacting_the_server() {
    let dashboard = Dashboard::start();
    dashboard.mount(
        Mock::given(method("DELETE"))
            .and(path("/1.1/apps/x1"))
            .respond_with(challenge())
            .expect(1),
    );
    dashboard.mount(
        Mock::given(path("/1.1/do2fa"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0),
    );

    let client = Client::by_region(dashboard.settings(), Region::Cn)
        .unwrap()
        .with_code_source(|| parse_code("twelve"));

    let err = client.delete("/1.1/apps/x1").unwrap_err();
    assert!(matches!(err, Error::Code(CodeError::NotNumeric(_))), "{err:?}");
    assert!(!dashboard.cookie_file_exists());
}

#[test]
fn challenge_without_token_is_malformed() {
    let dashboard = Dashboard::start();
    dashboard.mount(
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .expect(1),
    );

    let err = dashboard.client().get("/1.1/apps").unwrap_err();
    assert!(matches!(err, Error::MalformedChallenge(_)), "{err:?}");
}

#[test]
fn failed_exchange_is_reported_and_not_retried() {
    let dashboard = Dashboard::start();
    dashboard.mount(
        Mock::given(method("GET"))
            .and(path("/1.1/apps"))
            .respond_with(challenge())
            .expect(1),
    );
    dashboard.mount(
        Mock::given(method("POST"))
            .and(path("/1.1/do2fa"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"code": 216, "error": "invalid code"})),
            )
            .expect(1),
    );

    let client = Client::by_region(dashboard.settings(), Region::Cn)
        .unwrap()
        .with_code_source(|| -> Result<u32, CodeError> { Ok(1) });

    let err = client.get("/1.1/apps").unwrap_err();
    let Error::TwoFactorExchange(inner) = err else {
        panic!("Expected exchange error but got {err:?}");
    };
    let Error::Api(api) = *inner else {
        panic!("Expected the exchange to fail with an API error");
    };
    assert_eq!(api.code, 216);
    assert_eq!(api.error, "invalid code");
    assert!(!dashboard.cookie_file_exists());
}

#[test]
fn json_error_body_becomes_structured_error() {
    let dashboard = Dashboard::start();
    dashboard.mount(
        Mock::given(method("PUT"))
            .and(path("/1.1/apps/x1"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(json!({"code": 1, "error": "bad request"})),
            ),
    );

    let err = dashboard
        .client()
        .put("/1.1/apps/x1", &json!({"name": "renamed"}))
        .unwrap_err();
    let Error::Api(api) = err else {
        panic!("Expected API error but got {err:?}");
    };
    assert_eq!(api.code, 1);
    assert_eq!(api.error, "bad request");
    assert!(!dashboard.cookie_file_exists());
}

#[test]
fn plain_error_body_becomes_generic_error() {
    let dashboard = Dashboard::start();
    dashboard.mount(
        Mock::given(method("PATCH"))
            .and(path("/1.1/apps/x1"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request")),
    );

    let err = dashboard
        .client()
        .patch("/1.1/apps/x1", &json!({}))
        .unwrap_err();
    assert!(matches!(err, Error::Http { .. }), "{err:?}");
    assert_eq!(err.to_string(), "HTTP Error: 400, PATCH /1.1/apps/x1");
}

#[test]
fn transport_failure_does_not_persist_cookies() {
    let config = TempDir::new().unwrap();
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let settings =
        Settings::new(config.path()).with_dashboard(Some(format!("http://127.0.0.1:{port}")));

    let client = Client::by_region(settings.clone(), Region::Cn).unwrap();
    let err = client.get("/1.1/apps").unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "{err:?}");
    assert!(!err.is_fatal());
    assert!(!settings.cookie_path().exists());
}

#[test]
fn failure_to_persist_cookies_fails_the_call() {
    let dashboard = Dashboard::start();
    dashboard.mount(
        Mock::given(method("GET"))
            .and(path("/1.1/apps"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1),
    );
    fs::create_dir_all(dashboard.settings().cookie_path().with_extension("tmp")).unwrap();

    let err = dashboard.client().get("/1.1/apps").unwrap_err();
    assert!(
        matches!(err, Error::Cookies(CookieError::Write { .. })),
        "{err:?}"
    );
    assert!(!err.is_fatal());
    assert!(!dashboard.cookie_file_exists());
}
