//! HTTP surface: the embedded page plus three JSON endpoints the page drives.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tracing::{error, warn};

use crate::gemini::ImageGenerator;
use crate::state::{Controller, ImageState, PhaseView};

/// User-visible messages. Always generic: technical detail goes to the log,
/// never to the page.
pub const MSG_INVALID_FILE: &str = "Por favor, sube un archivo de imagen válido.";
pub const MSG_READ_FAILED: &str = "Error al leer el archivo de imagen.";
pub const MSG_GENERATION_FAILED: &str =
    "No se pudo generar la imagen. Por favor, inténtalo de nuevo con una imagen diferente.";

pub struct App<G> {
    controller: Mutex<Controller>,
    generator: G,
}

pub fn router<G: ImageGenerator>(generator: G) -> Router {
    let app = Arc::new(App {
        controller: Mutex::new(Controller::new()),
        generator,
    });

    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload::<G>))
        .route("/reset", post(reset::<G>))
        .route("/state", get(current_state::<G>))
        // Phone photos routinely beat axum's 2 MB default.
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
        .layer(CorsLayer::permissive())
        .with_state(app)
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../assets/index.html"))
}

/// One upload, one generation. The epoch taken at `begin` is presented again
/// when the generation settles, so a reset or newer upload in between makes
/// this outcome a no-op instead of clobbering fresher state.
async fn upload<G: ImageGenerator>(
    State(app): State<Arc<App<G>>>,
    mut multipart: Multipart,
) -> Result<Json<PhaseView>, (StatusCode, &'static str)> {
    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => return Err((StatusCode::BAD_REQUEST, MSG_INVALID_FILE)),
        Err(err) => {
            warn!("could not read upload: {err}");
            let mut controller = app.controller.lock().await;
            controller.fail_read(MSG_READ_FAILED);
            return Ok(Json(PhaseView::of(controller.phase())));
        }
    };

    // Same gate the page applies before sending: MIME type only, the bytes
    // are forwarded untouched.
    let mime_type = match field.content_type() {
        Some(mime) if mime.starts_with("image/") => mime.to_owned(),
        _ => return Err((StatusCode::BAD_REQUEST, MSG_INVALID_FILE)),
    };

    let data = match field.bytes().await {
        Ok(bytes) => bytes.to_vec(),
        Err(err) => {
            warn!("could not read upload body: {err}");
            let mut controller = app.controller.lock().await;
            controller.fail_read(MSG_READ_FAILED);
            return Ok(Json(PhaseView::of(controller.phase())));
        }
    };

    let original = ImageState::new(data, mime_type);
    let epoch = app.controller.lock().await.begin(original.clone());

    let outcome = app
        .generator
        .generate(&original.data, &original.mime_type)
        .await;

    let mut controller = app.controller.lock().await;
    match outcome {
        Ok(generated) => controller.complete(epoch, generated),
        Err(err) => {
            error!("generation failed: {err}");
            controller.fail(epoch, MSG_GENERATION_FAILED);
        }
    }
    Ok(Json(PhaseView::of(controller.phase())))
}

async fn reset<G: ImageGenerator>(State(app): State<Arc<App<G>>>) -> Json<PhaseView> {
    let mut controller = app.controller.lock().await;
    controller.reset();
    Json(PhaseView::of(controller.phase()))
}

async fn current_state<G: ImageGenerator>(State(app): State<Arc<App<G>>>) -> Json<PhaseView> {
    let controller = app.controller.lock().await;
    Json(PhaseView::of(controller.phase()))
}
