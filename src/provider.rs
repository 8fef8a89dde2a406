//! Video hosts that a url upload is pushed to.
//!
//! [`UploadProvider`] is the seam between the http handlers and whatever
//! performs the upload. [`SimulatedProvider`] is the only implementation:
//! it sleeps for a random delay and invents links.

use std::{future::Future, ops::RangeInclusive, time::Duration};

use rand::Rng;

/// The three hosts every upload lands on, in display order.
#[derive(
	Debug,
	Clone,
	Copy,
	PartialEq,
	Eq,
	Hash,
	strum::Display,
	strum::EnumString,
	strum::EnumIter,
)]
pub enum Host {
	RPMShare,
	Abyss,
	StreamHG,
}

impl Host {
	/// Embed url for a file with the given id on this host.
	pub fn link(&self, file_id: &str) -> String {
		match self {
			Self::RPMShare => format!("https://playlinkhub.rpmvid.com/#{file_id}"),
			Self::Abyss => format!("https://abyss.to/embed/{file_id}"),
			Self::StreamHG => format!("https://streamhg.com/v/{file_id}"),
		}
	}
}

/// One link per host.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HostLinks {
	#[serde(rename = "RPMShare")]
	pub rpm_share: String,
	#[serde(rename = "Abyss")]
	pub abyss: String,
	#[serde(rename = "StreamHG")]
	pub stream_hg: String,
}

impl HostLinks {
	pub fn get(&self, host: Host) -> &str {
		match host {
			Host::RPMShare => &self.rpm_share,
			Host::Abyss => &self.abyss,
			Host::StreamHG => &self.stream_hg,
		}
	}

	/// `(host, link)` pairs in display order.
	pub fn iter(&self) -> impl Iterator<Item = (Host, &str)> {
		<Host as strum::IntoEnumIterator>::iter().map(|host| (host, self.get(host)))
	}

	/// Links with a fresh random id per host.
	pub fn generate(rng: &mut impl Rng) -> Self {
		Self {
			rpm_share: Host::RPMShare.link(&random_file_id(rng)),
			abyss: Host::Abyss.link(&random_file_id(rng)),
			stream_hg: Host::StreamHG.link(&random_file_id(rng)),
		}
	}
}

/// 8 random bytes as 16 lowercase hex characters.
pub fn random_file_id(rng: &mut impl Rng) -> String {
	hex::encode(rng.gen::<[u8; 8]>())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
	#[error("{host} rejected the upload: {reason}")]
	Rejected { host: Host, reason: String },
	#[error("could not reach {0}")]
	Unreachable(Host),
}

pub trait UploadProvider: Send + Sync + 'static {
	/// Push the video at `video_url` to every host.
	/// `video_url` has already been validated.
	fn upload(
		&self,
		video_url: &str,
	) -> impl Future<Output = Result<HostLinks, ProviderError>> + Send;
}

/// Pretends to upload: waits a random delay, then returns made up links.
#[derive(Debug, Clone)]
pub struct SimulatedProvider {
	delay: RangeInclusive<Duration>,
}

impl SimulatedProvider {
	pub fn new(delay: RangeInclusive<Duration>) -> Self {
		Self { delay }
	}

	/// Responds immediately.
	pub fn instant() -> Self {
		Self::new(Duration::ZERO..=Duration::ZERO)
	}

	fn pick_delay(&self) -> Duration {
		let (min, max) = (*self.delay.start(), *self.delay.end());
		if min >= max {
			return min;
		}
		rand::thread_rng().gen_range(min..=max)
	}
}

impl UploadProvider for SimulatedProvider {
	fn upload(
		&self,
		video_url: &str,
	) -> impl Future<Output = Result<HostLinks, ProviderError>> + Send {
		let delay = self.pick_delay();
		tracing::debug!("simulating upload of {video_url} with a {delay:?} delay");
		async move {
			tokio::time::sleep(delay).await;
			Ok(HostLinks::generate(&mut rand::thread_rng()))
		}
	}
}
