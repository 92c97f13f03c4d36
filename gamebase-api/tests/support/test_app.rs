#![allow(dead_code)]

use gamebase_api::k8s::K8sClient;
use gamebase_api::routes::users::{
    LoginRequest, RegisterRequest, TokenResponse, UpdateProfileRequest,
};
use gamebase_api::templates::TemplateRegistry;
use gamebase_api::{config::ApiConfig, startup::run};
use gamebase_config::{Environment, load_config};
use reqwest::{IntoUrl, RequestBuilder};
use serde_json::json;
use std::io;
use std::net::TcpListener;
use std::sync::Arc;
use uuid::Uuid;

use crate::support::k8s_client::FakeCluster;

pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub cluster: Arc<FakeCluster>,
    config: ApiConfig,
    server_handle: tokio::task::JoinHandle<io::Result<()>>,
}

impl TestApp {
    fn get_authenticated<U: IntoUrl>(&self, url: U, token: &str) -> RequestBuilder {
        self.api_client.get(url).bearer_auth(token)
    }

    fn post_authenticated<U: IntoUrl>(&self, url: U, token: &str) -> RequestBuilder {
        self.api_client.post(url).bearer_auth(token)
    }

    fn delete_authenticated<U: IntoUrl>(&self, url: U, token: &str) -> RequestBuilder {
        self.api_client.delete(url).bearer_auth(token)
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub async fn register(&self, request: &RegisterRequest) -> reqwest::Response {
        self.api_client
            .post(format!("{}/v1/users/register", &self.address))
            .json(request)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn login(&self, request: &LoginRequest) -> reqwest::Response {
        self.api_client
            .post(format!("{}/v1/users/login", &self.address))
            .json(request)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn update_profile(
        &self,
        token: &str,
        request: &UpdateProfileRequest,
    ) -> reqwest::Response {
        self.post_authenticated(format!("{}/v1/users/profile", &self.address), token)
            .json(request)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Registers a tenant with a random email and returns its access token.
    pub async fn create_tenant(&self) -> String {
        let request = RegisterRequest {
            email: format!("{}@players.test", Uuid::new_v4().simple()),
            name: "Test Player".to_string(),
            password: "correct horse battery staple".into(),
        };
        let response: TokenResponse = self
            .register(&request)
            .await
            .json()
            .await
            .expect("failed to deserialize response");

        response.token
    }

    pub async fn list_templates(&self, token: &str) -> reqwest::Response {
        self.get_authenticated(format!("{}/v1/templates", &self.address), token)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn read_all_game_servers(&self, token: &str) -> reqwest::Response {
        self.get_authenticated(format!("{}/v1/gameservers", &self.address), token)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn read_game_server(&self, token: &str, id: &str) -> reqwest::Response {
        self.get_authenticated(format!("{}/v1/gameservers/{id}", &self.address), token)
            .send()
            .await
            .expect("failed to execute request")
    }

    pub async fn deploy_game_server(&self, token: &str, template: &str) -> reqwest::Response {
        self.post_authenticated(format!("{}/v1/gameservers", &self.address), token)
            .json(&json!({ "template": template }))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Deploys `template` and returns the id of the new game server.
    pub async fn create_game_server(&self, token: &str, template: &str) -> String {
        let response: serde_json::Value = self
            .deploy_game_server(token, template)
            .await
            .json()
            .await
            .expect("failed to deserialize response");

        response["id"]
            .as_str()
            .expect("deploy response without an id")
            .to_string()
    }

    pub async fn configure_game_server(
        &self,
        token: &str,
        id: &str,
        patch: &serde_json::Value,
    ) -> reqwest::Response {
        self.post_authenticated(
            format!("{}/v1/gameservers/{id}/configure", &self.address),
            token,
        )
        .json(patch)
        .send()
        .await
        .expect("Failed to execute request.")
    }

    async fn lifecycle(&self, token: &str, id: &str, action: &str) -> reqwest::Response {
        self.post_authenticated(
            format!("{}/v1/gameservers/{id}/{action}", &self.address),
            token,
        )
        .send()
        .await
        .expect("Failed to execute request.")
    }

    pub async fn start_game_server(&self, token: &str, id: &str) -> reqwest::Response {
        self.lifecycle(token, id, "start").await
    }

    pub async fn stop_game_server(&self, token: &str, id: &str) -> reqwest::Response {
        self.lifecycle(token, id, "stop").await
    }

    pub async fn restart_game_server(&self, token: &str, id: &str) -> reqwest::Response {
        self.lifecycle(token, id, "restart").await
    }

    pub async fn delete_game_server(&self, token: &str, id: &str) -> reqwest::Response {
        self.delete_authenticated(format!("{}/v1/gameservers/{id}", &self.address), token)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

pub async fn spawn_test_app() -> TestApp {
    // We set the environment to dev.
    Environment::Dev.set();

    let base_address = "127.0.0.1";
    let listener =
        TcpListener::bind(format!("{base_address}:0")).expect("failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let mut config = load_config::<ApiConfig>().expect("Failed to read configuration");
    // Restarts in tests should not wait on real clocks.
    config.cluster.restart_poll_interval_ms = 10;

    let templates = Arc::new(
        TemplateRegistry::load_all(&config.templates.path).expect("failed to load templates"),
    );
    let cluster = Arc::new(FakeCluster::new());

    let server = run(
        config.clone(),
        listener,
        cluster.clone() as Arc<dyn K8sClient>,
        templates,
    )
    .await
    .expect("failed to bind address");

    let server_handle = tokio::spawn(server);

    TestApp {
        address: format!("http://{base_address}:{port}"),
        api_client: reqwest::Client::new(),
        cluster,
        config,
        server_handle,
    }
}
