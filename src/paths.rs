use std::env;
use std::ffi::OsString;
use std::path::PathBuf;

const APP_DIR: &str = "ttrack";
const DATABASE_FILE: &str = "database.json";

/// Picks the ledger file: CLI flag, then `TTRACK_DATABASE`, then the config
/// file, then the platform's local data directory.
pub fn resolve_database_path(cli_path: Option<PathBuf>, configured: Option<PathBuf>) -> PathBuf {
	resolve_from(cli_path, env::var_os("TTRACK_DATABASE"), configured)
}

fn resolve_from(
	cli_path: Option<PathBuf>,
	env_path: Option<OsString>,
	configured: Option<PathBuf>,
) -> PathBuf {
	if let Some(path) = cli_path {
		return absolutize(path);
	}

	if let Some(path) = env_path {
		let path = PathBuf::from(path);
		if !path.as_os_str().is_empty() {
			return absolutize(path);
		}
	}

	if let Some(path) = configured {
		return absolutize(path);
	}

	default_database_path()
}

fn default_database_path() -> PathBuf {
	if let Some(dir) = dirs::data_local_dir() {
		return dir.join(APP_DIR).join(DATABASE_FILE);
	}

	if let Some(home) = env::var_os("HOME") {
		return PathBuf::from(home)
			.join(".local")
			.join("share")
			.join(APP_DIR)
			.join(DATABASE_FILE);
	}

	PathBuf::from(APP_DIR).join(DATABASE_FILE)
}

fn absolutize(path: PathBuf) -> PathBuf {
	if path.is_absolute() {
		path
	} else if let Ok(cwd) = env::current_dir() {
		cwd.join(path)
	} else {
		path
	}
}
