//! In-process object store serving artifacts over plain HTTP.

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use async_trait::async_trait;
use testlab_addon_lib::error::AppResult;
use testlab_addon_lib::services::ArtifactStore;

type Objects = Arc<Mutex<HashMap<String, String>>>;

/// Serves `GET /{key}` from an in-memory map; unknown keys answer 404.
pub struct MockArtifactServer {
    pub base_url: String,
    objects: Objects,
}

async fn get_object(req: HttpRequest, objects: web::Data<Mutex<HashMap<String, String>>>) -> HttpResponse {
    let key = req.path().trim_start_matches('/');
    match objects.lock().unwrap().get(key) {
        Some(body) => HttpResponse::Ok()
            .content_type("application/xml")
            .body(body.clone()),
        None => HttpResponse::NotFound().finish(),
    }
}

impl MockArtifactServer {
    pub fn start() -> Self {
        let objects: Objects = Arc::new(Mutex::new(HashMap::new()));
        let data = web::Data::from(objects.clone());

        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind mock store");
        let port = listener.local_addr().unwrap().port();
        let server = HttpServer::new(move || {
            App::new()
                .app_data(data.clone())
                .default_service(web::get().to(get_object))
        })
        .listen(listener)
        .expect("failed to listen")
        .disable_signals()
        .workers(1)
        .run();
        tokio::spawn(server);

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            objects,
        }
    }

    pub fn put(&self, key: &str, body: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), body.to_string());
    }

    /// Presigner handing out plain URLs on this server.
    pub fn store(&self) -> MockStore {
        MockStore {
            base_url: self.base_url.clone(),
        }
    }
}

pub struct MockStore {
    base_url: String,
}

#[async_trait]
impl ArtifactStore for MockStore {
    async fn download_url(&self, key: &str) -> AppResult<String> {
        Ok(format!("{}/{}", self.base_url, key))
    }

    async fn upload_url(&self, key: &str, content_length: i64) -> AppResult<String> {
        Ok(format!(
            "{}/{}?content-length={}",
            self.base_url, key, content_length
        ))
    }
}
