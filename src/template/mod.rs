use askama::Template;
use strum::IntoEnumIterator;

use crate::{
	provider::{Host, HostLinks},
	store::{FileRecord, FileStore},
};

/// A partial that the shell can swap into its content area.
#[derive(
	Debug,
	Clone,
	Copy,
	PartialEq,
	Eq,
	Default,
	strum::Display,
	strum::EnumString,
	strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum Page {
	#[default]
	Dashboard,
	UrlUpload,
	FileManager,
	GdUpload,
}

impl Page {
	pub fn title(&self) -> &'static str {
		match self {
			Self::Dashboard => "Dashboard",
			Self::UrlUpload => "URL Upload",
			Self::FileManager => "File Manager",
			Self::GdUpload => "Google Drive Upload",
		}
	}

	pub fn icon(&self) -> &'static str {
		match self {
			Self::Dashboard => "fa-gauge",
			Self::UrlUpload => "fa-link",
			Self::FileManager => "fa-folder-open",
			Self::GdUpload => "fa-cloud-arrow-up",
		}
	}

	/// Parses a page name as it appears in a request path,
	/// with or without the `.html` extension.
	pub fn from_path(name: &str) -> Option<Self> {
		name.strip_suffix(".html").unwrap_or(name).parse().ok()
	}

	/// Renders this page's partial from the current files.
	pub fn render(&self, files: &FileStore) -> askama::Result<String> {
		match self {
			Self::Dashboard => DashboardPage::new(files).render(),
			Self::UrlUpload => UrlUploadPage {}.render(),
			Self::FileManager => FileManagerPage { files: files.records() }.render(),
			Self::GdUpload => GdUploadPage {}.render(),
		}
	}
}

/// The single page shell. Partials are loaded into it by `static/script.js`.
#[derive(Template)]
#[template(path = "index.html")]
pub struct Index {
	pages: Vec<Page>,
	default_page: Page,
}

impl Index {
	pub fn new() -> Self {
		Self { pages: Page::iter().collect(), default_page: Page::default() }
	}
}

impl Default for Index {
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Template)]
#[template(path = "pages/dashboard.html")]
pub struct DashboardPage<'a> {
	total: usize,
	host_counts: Vec<(&'a str, usize)>,
	hosts: Vec<Host>,
}

impl<'a> DashboardPage<'a> {
	pub fn new(files: &'a FileStore) -> Self {
		Self { total: files.len(), host_counts: files.host_counts(), hosts: Host::iter().collect() }
	}
}

#[derive(Template)]
#[template(path = "pages/url_upload.html")]
pub struct UrlUploadPage {}

#[derive(Template)]
#[template(path = "pages/file_manager.html")]
pub struct FileManagerPage<'a> {
	files: &'a [FileRecord],
}

/// Just the `<tr>`s of the file manager table.
#[derive(Template)]
#[template(path = "partials/file_rows.html")]
pub struct FileRows<'a> {
	pub files: &'a [FileRecord],
}

#[derive(Template)]
#[template(path = "pages/gd_upload.html")]
pub struct GdUploadPage {}

#[derive(Template)]
#[template(path = "partials/load_error.html")]
pub struct LoadError<'a> {
	pub page: &'a str,
}

/// Message and links shown under the url upload form.
#[derive(Template)]
#[template(path = "partials/upload_outcome.html")]
pub struct UploadOutcome {
	success: bool,
	message: String,
	links: Vec<(Host, String)>,
}

impl UploadOutcome {
	pub fn failed(message: impl Into<String>) -> Self {
		Self { success: false, message: message.into(), links: Vec::new() }
	}

	pub fn uploaded(message: impl Into<String>, links: &HostLinks) -> Self {
		Self {
			success: true,
			message: message.into(),
			links: links.iter().map(|(host, link)| (host, link.to_owned())).collect(),
		}
	}
}

pub const MSG_NO_VIDEO: &str = "Error: Video URL is missing.";
pub const MSG_BAD_VIDEO: &str = "Error: Video URL must be an http(s) link.";

/// Embed page for a video link. Only http(s) links are embedded.
#[derive(Template)]
#[template(path = "player.html")]
pub struct Player {
	video: Result<String, &'static str>,
}

impl Player {
	pub fn new(video: Option<String>) -> Self {
		let video = match video.as_deref().map(str::trim) {
			None | Some("") => Err(MSG_NO_VIDEO),
			Some(raw) => match url::Url::parse(raw) {
				Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(raw.to_owned()),
				_ => Err(MSG_BAD_VIDEO),
			},
		};
		Self { video }
	}
}
