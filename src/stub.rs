use crate::provider::{HostLinks, UploadProvider};

pub const URL_UPLOAD_ACTION: &str = "url_upload";

pub const MSG_UPLOADED: &str = "Video uploaded to multiple hosts successfully.";
pub const MSG_INVALID_URL: &str = "Invalid video URL provided.";
pub const MSG_INVALID_REQUEST: &str = "Invalid action or request method.";

/// Body of a response from the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UploadResult {
	pub success: bool,
	pub message: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub original_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub links: Option<HostLinks>,
}

impl UploadResult {
	pub fn failure(message: impl Into<String>) -> Self {
		Self { success: false, message: message.into(), original_url: None, links: None }
	}

	pub fn uploaded(original_url: String, links: HostLinks) -> Self {
		Self {
			success: true,
			message: MSG_UPLOADED.to_owned(),
			original_url: Some(original_url),
			links: Some(links),
		}
	}

	pub fn invalid_request() -> Self {
		Self::failure(MSG_INVALID_REQUEST)
	}
}

/// Form fields accepted by the endpoint. Anything missing makes the request invalid.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ApiRequest {
	pub action: Option<String>,
	pub video_url: Option<String>,
}

/// Answers one endpoint request.
pub async fn handle<P: UploadProvider>(provider: &P, request: ApiRequest) -> UploadResult {
	match (request.action.as_deref(), request.video_url) {
		(Some(URL_UPLOAD_ACTION), Some(video_url)) => url_upload(provider, &video_url).await,
		(action, _) => {
			tracing::debug!("rejecting api request with action {action:?}");
			UploadResult::invalid_request()
		}
	}
}

/// Validates `raw_url` and hands it to the provider.
pub async fn url_upload<P: UploadProvider>(provider: &P, raw_url: &str) -> UploadResult {
	let Some(video_url) = validate_url(raw_url) else {
		tracing::info!("invalid video url {raw_url:?}");
		return UploadResult::failure(MSG_INVALID_URL);
	};

	match provider.upload(&video_url).await {
		Ok(links) => {
			tracing::info!("uploaded {video_url}");
			UploadResult::uploaded(video_url, links)
		}
		Err(err) => {
			tracing::warn!("upload of {video_url} failed: {err}");
			UploadResult::failure(err.to_string())
		}
	}
}

/// Schemes whose urls are valid without a host.
const HOSTLESS_SCHEMES: [&str; 3] = ["mailto", "news", "file"];

/// Strips characters that can't appear in a url and checks that
/// what's left is an absolute url with a host. Returns the stripped url.
pub fn validate_url(raw: &str) -> Option<String> {
	let sanitized = sanitize_url(raw);
	let parsed = url::Url::parse(&sanitized).ok()?;
	let has_host = parsed.host_str().is_some_and(|host| !host.is_empty());
	if !has_host && !HOSTLESS_SCHEMES.contains(&parsed.scheme()) {
		return None;
	}
	if parsed.cannot_be_a_base() && parsed.path().is_empty() {
		return None;
	}
	Some(sanitized)
}

fn sanitize_url(raw: &str) -> String {
	const ALLOWED_SYMBOLS: &str = "$-_.+!*'(),{}|\\^~[]`<>#%\";/?:@&=";
	raw.chars()
		.filter(|c| c.is_ascii_alphanumeric() || ALLOWED_SYMBOLS.contains(*c))
		.collect()
}
