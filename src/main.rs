use multihost::config::{Config, CONFIG_PATH};
use multihost::{logging, web};

#[tokio::main]
async fn main() {
	let config = match Config::load(CONFIG_PATH) {
		Ok(x) => x,
		Err(err) => {
			// logging isn't up yet, its settings live in the config
			eprintln!("Failed to load {CONFIG_PATH}: {err}");
			std::process::exit(1);
		}
	};

	let _log_guard = match logging::init(&config) {
		Ok(x) => x,
		Err(err) => {
			eprintln!("Failed to initialize logging: {err}");
			std::process::exit(1);
		}
	};

	tracing::debug!("Loaded config {:?}", config);

	web::initialize_server(config).await;
}
