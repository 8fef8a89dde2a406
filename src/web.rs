use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use askama::Template;
use axum::extract::rejection::FormRejection;
use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::{self, WebSocket};
use axum::extract::{Form, Path, Query, State, WebSocketUpgrade};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{
	routing::{delete, get, post},
	Json, Router,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::provider::{SimulatedProvider, UploadProvider};
use crate::store::FileStore;
use crate::stub::{self, ApiRequest, UploadResult};
use crate::task::{Pacing, TaskId, TaskManager, TaskStatus, TaskUpdateReceiver};
use crate::template::{self, Page};

pub const MSG_EMPTY_URL: &str = "Please paste a valid video URL.";
pub const MSG_URL_UPLOADED: &str = "Remote upload successful! Links generated.";
pub const MSG_URL_UPLOAD_FAILED: &str = "Remote upload failed due to an unknown error.";
pub const MSG_NO_FILE: &str = "Please select a file to upload.";

pub struct AppState<P> {
	pub files: Arc<RwLock<FileStore>>,
	pub provider: Arc<P>,
	pub task_manager: Arc<TaskManager>,
}

// derive(Clone) would require P: Clone
impl<P> Clone for AppState<P> {
	fn clone(&self) -> Self {
		Self {
			files: self.files.clone(),
			provider: self.provider.clone(),
			task_manager: self.task_manager.clone(),
		}
	}
}

impl<P: UploadProvider> AppState<P> {
	pub fn new(files: FileStore, provider: P, pacing: Pacing) -> Self {
		Self {
			files: Arc::new(RwLock::new(files)),
			provider: Arc::new(provider),
			task_manager: Arc::new(TaskManager::new(pacing)),
		}
	}
}

impl AppState<SimulatedProvider> {
	/// State the server starts with: sample files and the simulated provider.
	pub fn from_config(config: &Config) -> Self {
		Self::new(
			FileStore::seeded(),
			SimulatedProvider::new(config.upload_delay()),
			Pacing { tick: config.progress_tick(), finish_delay: config.progress_finish_delay() },
		)
	}
}

/// All routes of the dashboard. Requests that match nothing are served from `web_root`.
pub fn router<P: UploadProvider>(state: AppState<P>, config: &Config) -> Router {
	let api_route = post(api::<P>).fallback(api_invalid_method);

	Router::new()
		.route("/", get(index))
		.route("/pages/:page", get(page::<P>))
		.route("/files", get(list_files::<P>))
		.route("/files/rows", get(file_rows::<P>))
		.route("/files/:id", delete(delete_file::<P>))
		.route("/upload/url", post(upload_url::<P>))
		.route("/upload/local", post(upload_local::<P>))
		.route("/upload/local/status", get(local_status::<P>))
		.route("/upload/local/ws", get(local_status_ws::<P>))
		.route("/api", api_route.clone())
		.route("/api.php", api_route)
		.route("/player", get(player))
		.route("/player.html", get(player))
		.fallback_service(ServeDir::new(&config.web_root))
		.with_state(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(AllowOrigin::any())
				.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
				.allow_headers([CONTENT_TYPE]),
		)
}

pub async fn initialize_server(config: Config) {
	let app_state = AppState::from_config(&config);
	let router = router(app_state, &config);
	let addr = config.socket_addr();

	match &config.tls {
		Some(tls) => {
			let rustls_config =
				match axum_server::tls_rustls::RustlsConfig::from_pem_file(&tls.cert, &tls.key)
					.await
				{
					Ok(x) => x,
					Err(err) => {
						tracing::error!("Failed to load tls certificate: {}", err);
						return;
					}
				};
			tracing::info!("Started server on https://{}", addr);
			if let Err(err) = axum_server::bind_rustls(addr, rustls_config)
				.serve(router.into_make_service())
				.await
			{
				tracing::error!("Server error: {}", err);
			}
		}
		None => {
			let server = match axum::Server::try_bind(&addr) {
				Ok(x) => x,
				Err(err) => {
					tracing::error!("Failed to bind {}: {}", addr, err);
					return;
				}
			};
			tracing::info!("Started server on http://{}", addr);
			if let Err(err) = server
				.serve(router.into_make_service())
				.with_graceful_shutdown(shutdown_signal())
				.await
			{
				tracing::error!("Server error: {}", err);
			}
		}
	}
}

async fn shutdown_signal() {
	if let Err(err) = tokio::signal::ctrl_c().await {
		tracing::error!("Failed to listen for ctrl-c: {}", err);
		std::future::pending::<()>().await;
	}
	tracing::info!("Shutting down");
}

enum EndpointResult<T: IntoResponse> {
	Ok(T),
	Accepted(T),
	Err(StatusCode, Option<Cow<'static, str>>),
}

impl<T: IntoResponse> IntoResponse for EndpointResult<T> {
	fn into_response(self) -> axum::response::Response {
		match self {
			Self::Ok(t) => t.into_response(),
			Self::Accepted(r) => (StatusCode::ACCEPTED, r).into_response(),
			Self::Err(code, msg) => (code, msg.unwrap_or_default()).into_response(),
		}
	}
}

/// Renders a template, logging and mapping failures to a 500.
fn render<T: Template>(template: &T) -> EndpointResult<Html<String>> {
	match template.render() {
		Ok(html) => EndpointResult::Ok(Html(html)),
		Err(err) => {
			tracing::error!("Failed to render template: {}", err);
			EndpointResult::Err(StatusCode::INTERNAL_SERVER_ERROR, None)
		}
	}
}

/// Inline error shown in place of a partial that can't be loaded.
fn load_error(status: StatusCode, page: &str) -> Response {
	let body = template::LoadError { page }.render().unwrap_or_default();
	(status, Html(body)).into_response()
}

async fn index() -> impl IntoResponse {
	template::Index::new()
}

async fn page<P: UploadProvider>(
	State(state): State<AppState<P>>,
	Path(name): Path<String>,
) -> Response {
	let Some(page) = Page::from_path(&name) else {
		tracing::debug!("unknown page {name:?}");
		let name = name.strip_suffix(".html").unwrap_or(&name);
		return load_error(StatusCode::NOT_FOUND, name);
	};

	let rendered = page.render(&*state.files.read().await);
	match rendered {
		Ok(html) => Html(html).into_response(),
		Err(err) => {
			tracing::error!("Failed to render {page}: {}", err);
			load_error(StatusCode::INTERNAL_SERVER_ERROR, &page.to_string())
		}
	}
}

async fn list_files<P: UploadProvider>(State(state): State<AppState<P>>) -> impl IntoResponse {
	Json(state.files.read().await.records().to_vec())
}

async fn file_rows<P: UploadProvider>(
	State(state): State<AppState<P>>,
) -> EndpointResult<Html<String>> {
	let files = state.files.read().await;
	render(&template::FileRows { files: files.records() })
}

/// Deletes a file and returns the re-rendered table rows.
async fn delete_file<P: UploadProvider>(
	State(state): State<AppState<P>>,
	Path(id): Path<String>,
) -> Response {
	let mut files = state.files.write().await;
	let removed = files.remove(&id);
	let rows = render(&template::FileRows { files: files.records() });

	match removed {
		Some(file) => {
			tracing::info!("deleted file {} ({:?})", id, file.name);
			rows.into_response()
		}
		None => {
			tracing::debug!("no file with id {id:?} to delete");
			(StatusCode::NOT_FOUND, rows).into_response()
		}
	}
}

#[derive(serde::Deserialize)]
struct UrlUploadForm {
	#[serde(default)]
	video_url: String,
}

/// Submit a url from the upload form.
///
/// Responds with the markup for the message and link list shown under the form.
/// Successful uploads are added to the file manager.
async fn upload_url<P: UploadProvider>(
	State(state): State<AppState<P>>,
	form: Result<Form<UrlUploadForm>, FormRejection>,
) -> EndpointResult<Html<String>> {
	let video_url = match &form {
		Ok(Form(form)) => form.video_url.trim(),
		Err(err) => {
			tracing::debug!("bad upload form: {}", err);
			""
		}
	};

	if video_url.is_empty() {
		return render(&template::UploadOutcome::failed(MSG_EMPTY_URL));
	}

	let result = stub::url_upload(&*state.provider, video_url).await;

	let outcome = match result {
		UploadResult { success: true, links: Some(links), .. } => {
			let record = state.files.write().await.push_remote(video_url, &links.rpm_share);
			tracing::info!("added file {} ({:?})", record.id, record.name);
			template::UploadOutcome::uploaded(MSG_URL_UPLOADED, &links)
		}
		UploadResult { message, .. } if !message.is_empty() => {
			template::UploadOutcome::failed(message)
		}
		_ => template::UploadOutcome::failed(MSG_URL_UPLOAD_FAILED),
	};

	render(&outcome)
}

#[derive(serde::Deserialize)]
struct LocalUploadForm {
	#[serde(default)]
	file_name: String,
}

/// Start a simulated upload of a local file.
///
/// Returns the id of the simulation, which the client may later query.
async fn upload_local<P: UploadProvider>(
	State(state): State<AppState<P>>,
	form: Result<Form<LocalUploadForm>, FormRejection>,
) -> EndpointResult<String> {
	let file_name = match form {
		Ok(Form(LocalUploadForm { file_name })) if !file_name.trim().is_empty() => file_name,
		_ => return EndpointResult::Err(StatusCode::BAD_REQUEST, Some(MSG_NO_FILE.into())),
	};

	let task_id = state.task_manager.new_task(file_name).await;
	EndpointResult::Accepted(task_id.to_string())
}

#[derive(serde::Deserialize)]
struct TaskStatusQuery {
	t: TaskId,
}

async fn local_status<P: UploadProvider>(
	State(state): State<AppState<P>>,
	Query(TaskStatusQuery { t }): Query<TaskStatusQuery>,
) -> EndpointResult<Json<TaskStatus>> {
	let Some(task) = state.task_manager.get_task(t).await else {
		return EndpointResult::Err(StatusCode::NOT_FOUND, Some("task not found".into()));
	};

	EndpointResult::Ok(Json(task.last_status().await))
}

async fn local_status_ws<P: UploadProvider>(
	ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
	State(state): State<AppState<P>>,
	Query(TaskStatusQuery { t }): Query<TaskStatusQuery>,
) -> EndpointResult<Response> {
	// reject upgrade if no task found
	// subscribe before reading the status so no update falls in between
	let (rx, current) = match state.task_manager.get_task(t).await {
		Some(task) => {
			let rx = task.subscribe();
			(rx, task.last_status().await)
		}
		None => {
			tracing::info!("ws upgrade rejected: task not found");
			return EndpointResult::Err(StatusCode::NOT_FOUND, None);
		}
	};

	let ws = match ws {
		Ok(x) => x,
		Err(err) => {
			tracing::info!("ws upgrade rejected: {}", err);
			return EndpointResult::Err(err.status(), None);
		}
	};

	EndpointResult::Ok(
		ws.on_failed_upgrade(|_| tracing::info!("ws upgrade failed"))
			.on_upgrade(move |ws| ws_handler(ws, t, current, rx)),
	)
}

async fn ws_handler(
	mut ws: WebSocket,
	target_task: TaskId,
	current: TaskStatus,
	mut task_rx: TaskUpdateReceiver,
) {
	tracing::debug!("ws connected for {target_task}");

	if forward_status(&mut ws, target_task, current, &mut task_rx).await {
		// give axum time to flush the socket
		tokio::time::sleep(Duration::from_millis(500)).await;
	}

	let _ = ws.close().await;
}

/// Where [`forward_status`] writes status updates to.
trait StatusSink {
	fn send_status(
		&mut self,
		status: &TaskStatus,
	) -> impl Future<Output = Result<(), axum::Error>> + Send;
}

impl StatusSink for WebSocket {
	fn send_status(
		&mut self,
		status: &TaskStatus,
	) -> impl Future<Output = Result<(), axum::Error>> + Send {
		let text = serde_json::to_string(status);
		async move {
			let text = text.map_err(axum::Error::new)?;
			self.send(ws::Message::Text(text)).await
		}
	}
}

/// Sends `current`, then every update from `task_rx` until the task completes.
///
/// Returns `true` once the completed status was sent, `false` if the sink or
/// the channel went away first.
async fn forward_status<S: StatusSink>(
	sink: &mut S,
	target_task: TaskId,
	current: TaskStatus,
	task_rx: &mut TaskUpdateReceiver,
) -> bool {
	let mut status = current;
	loop {
		if let Err(x) = sink.send_status(&status).await {
			tracing::info!("failed to send ws message for {target_task}: {x:?}");
			return false;
		}

		if status.is_completed() {
			return true;
		}

		status = loop {
			match task_rx.recv().await {
				Ok((_, next)) => break next,
				Err(RecvError::Closed) => {
					tracing::warn!("tx closed for {target_task}");
					return false;
				}
				// skipped updates are fine, the next one supersedes them
				Err(RecvError::Lagged(n)) => {
					tracing::warn!("rx lagged by {n} for {target_task}");
				}
			}
		};
	}
}

/// The upload endpoint. Always answers 200 with an [`UploadResult`].
async fn api<P: UploadProvider>(
	State(state): State<AppState<P>>,
	form: Result<Form<ApiRequest>, FormRejection>,
) -> Json<UploadResult> {
	let request = match form {
		Ok(Form(request)) => request,
		Err(err) => {
			tracing::debug!("bad api request: {}", err);
			return Json(UploadResult::invalid_request());
		}
	};

	Json(stub::handle(&*state.provider, request).await)
}

async fn api_invalid_method() -> Json<UploadResult> {
	Json(UploadResult::invalid_request())
}

#[derive(serde::Deserialize)]
struct PlayerQuery {
	video: Option<String>,
}

async fn player(query: Option<Query<PlayerQuery>>) -> impl IntoResponse {
	template::Player::new(query.and_then(|Query(x)| x.video))
}
