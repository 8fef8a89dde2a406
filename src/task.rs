use std::{collections::HashMap, fmt::Display, sync::Arc, time::Duration};

use rand::Rng;
use tokio::sync::{broadcast, Mutex, RwLock, RwLockReadGuard};

/// Largest step the progress bar takes per tick.
const MAX_STEP: u8 = 10;

pub type TaskUpdateSender = broadcast::Sender<TaskUpdateMessage>;
pub type TaskUpdateReceiver = broadcast::Receiver<TaskUpdateMessage>;

/// id of a simulated local upload
pub type TaskId = u64;
pub type TaskUpdateMessage = (TaskId, TaskStatus);

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskStatus {
	InProgress { percent: u8 },
	Completed { message: String },
}

impl TaskStatus {
	pub fn is_completed(&self) -> bool {
		matches!(self, Self::Completed { .. })
	}
}

impl Display for TaskStatus {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::InProgress { percent } => write!(f, "InProgress({percent}%)"),
			Self::Completed { .. } => write!(f, "Completed"),
		}
	}
}

/// Timing of a simulated upload.
#[derive(Clone, Copy, Debug)]
pub struct Pacing {
	pub tick: Duration,
	pub finish_delay: Duration,
}

/// Fake progress values: random steps of 1 to 10 percent,
/// clamped so the last value is exactly 100.
pub struct ProgressSteps<R> {
	rng: R,
	progress: u8,
}

impl<R: Rng> ProgressSteps<R> {
	pub fn new(rng: R) -> Self {
		Self { rng, progress: 0 }
	}
}

impl<R: Rng> Iterator for ProgressSteps<R> {
	type Item = u8;

	fn next(&mut self) -> Option<u8> {
		if self.progress >= 100 {
			return None;
		}
		let step = self.rng.gen_range(1..=MAX_STEP);
		self.progress = self.progress.saturating_add(step).min(100);
		Some(self.progress)
	}
}

pub fn completion_message(file_name: &str) -> String {
	format!("File \"{file_name}\" uploaded successfully to Google Drive! (Simulation)")
}

/// A simulated upload of a local file.
/// Nothing is transferred, a tokio task just ticks a progress value.
#[derive(Debug)]
pub struct Task {
	tokio_handle: tokio::task::JoinHandle<()>,
	id: TaskId,
	file_name: String,
	last_status: Arc<Mutex<TaskStatus>>,
	task_update_tx: TaskUpdateSender,
}

impl Task {
	/// initialize a new task and start the
	/// tokio task that drives it
	pub fn new(task_id: TaskId, file_name: String, pacing: Pacing) -> Task {
		let last_status = Arc::new(Mutex::new(TaskStatus::InProgress { percent: 0 }));
		let (task_update_tx, _) = broadcast::channel(16);

		let tokio_handle = tokio::task::spawn({
			let last_status = last_status.clone();
			let task_update_tx = task_update_tx.clone();
			let file_name = file_name.clone();
			async move {
				Self::run_simulation(task_id, file_name, pacing, last_status, task_update_tx)
					.await;
			}
		});

		Self { tokio_handle, id: task_id, file_name, last_status, task_update_tx }
	}

	pub fn id(&self) -> TaskId {
		self.id
	}

	pub fn file_name(&self) -> &str {
		&self.file_name
	}

	pub fn is_finished(&self) -> bool {
		self.tokio_handle.is_finished()
	}

	pub fn subscribe(&self) -> TaskUpdateReceiver {
		self.task_update_tx.subscribe()
	}

	pub async fn last_status(&self) -> TaskStatus {
		self.last_status.lock().await.clone()
	}

	pub fn gen_id() -> TaskId {
		rand::thread_rng().gen()
	}

	async fn run_simulation(
		task_id: TaskId,
		file_name: String,
		pacing: Pacing,
		status: Arc<Mutex<TaskStatus>>,
		progress_tx: TaskUpdateSender,
	) {
		tracing::debug!("begin simulated upload {task_id} of {file_name:?}");

		// StdRng because ThreadRng can't be held across an await
		let rng = <rand::rngs::StdRng as rand::SeedableRng>::from_entropy();
		for percent in ProgressSteps::new(rng) {
			tokio::time::sleep(pacing.tick).await;
			let update = TaskStatus::InProgress { percent };
			*status.lock().await = update.clone();
			// fails if nobody is listening, which is fine
			let _ = progress_tx.send((task_id, update));
		}

		tokio::time::sleep(pacing.finish_delay).await;

		let completed = TaskStatus::Completed { message: completion_message(&file_name) };
		*status.lock().await = completed.clone();
		let _ = progress_tx.send((task_id, completed));

		tracing::debug!("end simulated upload {task_id}");
	}
}

pub struct TaskManager {
	tasks: Arc<RwLock<HashMap<TaskId, Task>>>,
	pacing: Pacing,
}

impl TaskManager {
	pub fn new(pacing: Pacing) -> Self {
		Self { tasks: Arc::new(RwLock::new(HashMap::new())), pacing }
	}

	pub async fn new_task(&self, file_name: String) -> TaskId {
		let mut tasks = self.tasks.write().await;

		// forget simulations nobody can be waiting on anymore
		tasks.retain(|_, task| !task.is_finished());

		let mut task_id = Task::gen_id();
		while tasks.contains_key(&task_id) {
			task_id = Task::gen_id();
		}

		tracing::info!("starting simulated upload {task_id} of {file_name:?}");
		tasks.insert(task_id, Task::new(task_id, file_name, self.pacing));

		task_id
	}

	pub async fn get_task(&self, id: TaskId) -> Option<RwLockReadGuard<'_, Task>> {
		let tasks = self.tasks.read().await;
		RwLockReadGuard::try_map(tasks, |x| x.get(&id)).ok()
	}
}
