//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use image::{DynamicImage, ImageFormat, RgbImage};
use serde_json::{Value, json};

use shitu_core::Settings;
use shitu_gateway::{Recognizer, ReplyChannel, SendError, ShituHandler, WaitingRegistry};

struct FakeState {
    responses: Mutex<VecDeque<(u16, Value)>>,
    requests: Mutex<Vec<HashMap<String, String>>>,
    image: Vec<u8>,
}

/// In-process stand-in for the AnimeTrace search endpoint.
///
/// Answers `POST /v1/search` from a script (falling back to an empty result
/// set) and serves a generated PNG at `/img.png`.
pub struct FakeAnimeTrace {
    base_url: String,
    state: Arc<FakeState>,
}

impl FakeAnimeTrace {
    pub async fn start(responses: Vec<(u16, Value)>) -> Self {
        let state = Arc::new(FakeState {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
            image: png(1600, 900),
        });

        let app = Router::new()
            .route("/v1/search", post(search))
            .route("/img.png", get(serve_image))
            .route("/headimg_dl", get(serve_image))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn search_url(&self) -> String {
        format!("{}/v1/search", self.base_url)
    }

    pub fn image_url(&self) -> String {
        format!("{}/img.png", self.base_url)
    }

    pub fn avatar_template(&self) -> String {
        format!("{}/headimg_dl?dst_uin={{id}}&spec=640", self.base_url)
    }

    /// Form bodies received so far, in order.
    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn search(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> impl IntoResponse {
    state.requests.lock().unwrap().push(form);
    let (status, body) = state
        .responses
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or((200, json!({ "code": 0, "data": [] })));
    (StatusCode::from_u16(status).unwrap(), Json(body))
}

async fn serve_image(State(state): State<Arc<FakeState>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], state.image.clone())
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// Successful search body with one subject and the given candidates.
pub fn hit(characters: &[(&str, &str)]) -> Value {
    let characters: Vec<Value> = characters
        .iter()
        .map(|(character, work)| json!({ "character": character, "work": work }))
        .collect();
    json!({ "code": 0, "ai": false, "data": [ { "box": [0.0, 0.0, 1.0, 1.0], "character": characters } ] })
}

/// Reply channel that keeps everything sent through it.
#[derive(Default)]
pub struct RecordingChannel {
    sent: Mutex<Vec<String>>,
}

impl RecordingChannel {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn count(&self, text: &str) -> usize {
        self.sent().iter().filter(|sent| sent.as_str() == text).count()
    }
}

#[async_trait::async_trait]
impl ReplyChannel for RecordingChannel {
    async fn reply(&self, text: &str) -> Result<(), SendError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

pub fn settings(fake: &FakeAnimeTrace, session_timeout_seconds: u64) -> Settings {
    let mut settings = Settings::default();
    settings.recognition.api_url = fake.search_url();
    settings.recognition.timeout_seconds = 5;
    settings.session.timeout_seconds = session_timeout_seconds;
    settings.avatar.url_template = fake.avatar_template();
    settings
}

pub fn handler(settings: &Settings) -> ShituHandler {
    let recognizer = Recognizer::from_settings(&settings.recognition).unwrap();
    ShituHandler::new(recognizer, WaitingRegistry::new(), settings)
}
