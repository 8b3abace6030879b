use axum::extract::{Form, State};
use axum::response::Redirect;
use axum::Json;
use tracing::info;
use url::form_urlencoded;

use crate::browser;
use crate::pipeline;
use crate::request::{OpenAction, OpenForm};
use crate::state::SharedState;

/// `POST /open`. Validates the form; with credentials, starts a background
/// automation run and acknowledges immediately; the handler never waits on
/// the run's outcome. Without credentials, just opens the URL locally.
pub async fn open(State(state): State<SharedState>, Form(form): Form<OpenForm>) -> Redirect {
    match form.into_action() {
        Err(message) => flash_redirect("error", &message),
        Ok(OpenAction::BrowserOnly(url)) => match browser::open_in_chrome(&url) {
            Ok(message) => flash_redirect("success", &message),
            Err(e) => flash_redirect("error", &e.to_string()),
        },
        Ok(OpenAction::Automate(request)) => {
            let (run_id, token) = state.runs.create().await;
            info!(%run_id, "accepted automation request");
            let task_state = state.clone();
            tokio::spawn(async move {
                pipeline::run_report(task_state, run_id, token, request).await;
            });
            flash_redirect(
                "success",
                "Launching Chrome and attempting auto-login in the background.",
            )
        }
    }
}

/// `POST /api/cancel-generation`. Cancels every tracked run; there is no
/// per-run cancellation surface.
pub async fn cancel_generation(State(state): State<SharedState>) -> Json<serde_json::Value> {
    let cancelled = state.runs.cancel_all().await;
    info!("cancel-generation: cancelled {cancelled} run(s)");
    Json(serde_json::json!({
        "success": true,
        "message": format!("Cancelled {cancelled} process(es) and closed browser(s)")
    }))
}

/// There is no server-side session, so flash messages ride back to the
/// dashboard as query parameters and render client-side.
fn flash_redirect(kind: &str, message: &str) -> Redirect {
    let encoded: String = form_urlencoded::byte_serialize(message.as_bytes()).collect();
    Redirect::to(&format!("/?kind={kind}&msg={encoded}"))
}
