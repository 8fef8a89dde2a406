use rand::Rng;

/// Label used for records created by a url upload,
/// which land on every provider at once.
pub const MULTI_HOST: &str = "MultiHost";
pub const REMOTE_SIZE: &str = "N/A (Remote)";

const NAME_MAX_CHARS: usize = 50;
const ID_UPPER_BOUND: u32 = 1_000_000;

/// One row of the file manager.
///
/// Every field is display text; `date` is `YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FileRecord {
	pub id: String,
	pub name: String,
	pub size: String,
	pub host: String,
	pub date: String,
	pub url: String,
}

impl FileRecord {
	fn sample(id: &str, name: &str, size: &str, host: &str, date: &str, url: &str) -> Self {
		Self {
			id: id.to_owned(),
			name: name.to_owned(),
			size: size.to_owned(),
			host: host.to_owned(),
			date: date.to_owned(),
			url: url.to_owned(),
		}
	}
}

/// In-memory file list. Insertion order is display order.
#[derive(Debug, Clone, Default)]
pub struct FileStore {
	records: Vec<FileRecord>,
}

impl FileStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Store with the three sample files the dashboard starts with.
	pub fn seeded() -> Self {
		Self {
			records: vec![
				FileRecord::sample(
					"1a2b3c",
					"[Sample] One Fine Week S1E01.mp4",
					"150.5 MB",
					"RPMShare",
					"2024-10-31",
					"https://playlinkhub.rpmvid.com/#a1b2c3d4e5f6g7h8",
				),
				FileRecord::sample(
					"4d5e6f",
					"[Sample] Two Weeks - Episode 02.mkv",
					"312.8 MB",
					"Abyss",
					"2024-10-30",
					"https://abyss.to/embed/x9y8z7a6b5c4d3e2",
				),
				FileRecord::sample(
					"7g8h9i",
					"Movie Title HD.mov",
					"1.2 GB",
					"StreamHG",
					"2024-10-29",
					"https://streamhg.com/v/q9w8e7r6t5y4u3i2",
				),
			],
		}
	}

	pub fn records(&self) -> &[FileRecord] {
		&self.records
	}

	pub fn len(&self) -> usize {
		self.records.len()
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn contains(&self, id: &str) -> bool {
		self.records.iter().any(|x| x.id == id)
	}

	pub fn push(&mut self, record: FileRecord) {
		self.records.push(record);
	}

	/// Removes the record with the given id, keeping the order of the rest.
	pub fn remove(&mut self, id: &str) -> Option<FileRecord> {
		let index = self.records.iter().position(|x| x.id == id)?;
		Some(self.records.remove(index))
	}

	/// Random decimal id below one million that no record uses yet.
	pub fn fresh_id(&self, rng: &mut impl Rng) -> String {
		loop {
			let id = rng.gen_range(0..ID_UPPER_BOUND).to_string();
			if !self.contains(&id) {
				return id;
			}
		}
	}

	/// Appends a record for a finished url upload and returns it.
	pub fn push_remote(&mut self, source_url: &str, play_url: &str) -> FileRecord {
		let record = FileRecord {
			id: self.fresh_id(&mut rand::thread_rng()),
			name: display_name(source_url),
			size: REMOTE_SIZE.to_owned(),
			host: MULTI_HOST.to_owned(),
			date: time::OffsetDateTime::now_utc().date().to_string(),
			url: play_url.to_owned(),
		};
		self.records.push(record.clone());
		record
	}

	/// Number of records per host, in order of first appearance.
	pub fn host_counts(&self) -> Vec<(&str, usize)> {
		let mut counts: Vec<(&str, usize)> = Vec::new();
		for record in &self.records {
			match counts.iter_mut().find(|(host, _)| *host == record.host) {
				Some((_, n)) => *n += 1,
				None => counts.push((record.host.as_str(), 1)),
			}
		}
		counts
	}
}

/// File name shown for a remote upload: the last path segment of the url,
/// cut to 50 characters.
pub fn display_name(url: &str) -> String {
	let name = match url.rsplit_once('/') {
		Some((_, tail)) if !tail.is_empty() => tail,
		_ => url,
	};
	truncate(name, NAME_MAX_CHARS)
}

fn truncate(text: &str, max_chars: usize) -> String {
	if text.chars().count() <= max_chars {
		return text.to_owned();
	}
	let mut short: String = text.chars().take(max_chars - 3).collect();
	short.push_str("...");
	short
}

#[cfg(test)]
mod tests {
	use rand::{rngs::StdRng, SeedableRng};

	use super::*;

	fn ids(store: &FileStore) -> Vec<&str> {
		store.records().iter().map(|x| x.id.as_str()).collect()
	}

	#[test]
	fn seed_has_three_records_in_order() {
		let store = FileStore::seeded();
		assert_eq!(ids(&store), ["1a2b3c", "4d5e6f", "7g8h9i"]);
	}

	#[test]
	fn removing_first_seed_keeps_the_rest_in_order() {
		let mut store = FileStore::seeded();
		let removed = store.remove("1a2b3c").unwrap();
		assert_eq!(removed.name, "[Sample] One Fine Week S1E01.mp4");
		assert_eq!(store.len(), 2);
		assert_eq!(ids(&store), ["4d5e6f", "7g8h9i"]);
	}

	#[test]
	fn removing_middle_record_keeps_order() {
		let mut store = FileStore::seeded();
		store.remove("4d5e6f").unwrap();
		assert_eq!(ids(&store), ["1a2b3c", "7g8h9i"]);
	}

	#[test]
	fn removing_unknown_id_is_a_noop() {
		let mut store = FileStore::seeded();
		assert!(store.remove("nope").is_none());
		assert_eq!(store.len(), 3);
	}

	#[test]
	fn push_remote_appends_at_the_end() {
		let mut store = FileStore::seeded();
		let record = store.push_remote(
			"https://example.com/videos/clip.mp4",
			"https://playlinkhub.rpmvid.com/#0011223344556677",
		);
		assert_eq!(store.records().last(), Some(&record));
		assert_eq!(record.name, "clip.mp4");
		assert_eq!(record.host, MULTI_HOST);
		assert_eq!(record.size, REMOTE_SIZE);
		assert_eq!(record.url, "https://playlinkhub.rpmvid.com/#0011223344556677");
		assert_eq!(record.date.len(), 10);
		assert!(record.id.parse::<u32>().unwrap() < ID_UPPER_BOUND);
	}

	#[test]
	fn fresh_id_skips_taken_ids() {
		let mut store = FileStore::new();
		let first = store.fresh_id(&mut StdRng::seed_from_u64(7));
		store.push(FileRecord::sample(&first, "a", "", "", "", ""));
		let second = store.fresh_id(&mut StdRng::seed_from_u64(7));
		assert_ne!(first, second);
	}

	#[test]
	fn long_names_are_truncated() {
		let long = format!("https://example.com/{}.mp4", "a".repeat(60));
		let name = display_name(&long);
		assert_eq!(name.chars().count(), 50);
		assert!(name.ends_with("..."));
		assert_eq!(&name[..47], &"a".repeat(47));
	}

	#[test]
	fn fifty_char_name_is_kept() {
		let exact = "b".repeat(50);
		assert_eq!(display_name(&format!("https://example.com/{exact}")), exact);
	}

	#[test]
	fn trailing_slash_uses_whole_url() {
		assert_eq!(display_name("https://example.com/"), "https://example.com/");
	}

	#[test]
	fn host_counts_group_by_host() {
		let mut store = FileStore::seeded();
		store.push_remote("https://a.b/c.mp4", "x");
		store.push_remote("https://a.b/d.mp4", "y");
		assert_eq!(
			store.host_counts(),
			[("RPMShare", 1), ("Abyss", 1), ("StreamHG", 1), (MULTI_HOST, 2)]
		);
	}
}
