//! Process-wide stop requests.
//!
//! SIGINT, SIGTERM and SIGHUP only set a flag; the tracking loop polls it and
//! runs finalization on the main thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

static REQUESTED: AtomicBool = AtomicBool::new(false);

#[cfg(unix)]
extern "C" fn on_signal(_signal: libc::c_int) {
	REQUESTED.store(true, Ordering::SeqCst);
}

#[cfg(unix)]
const STOP_SIGNALS: [libc::c_int; 3] = [libc::SIGINT, libc::SIGTERM, libc::SIGHUP];

pub fn install() {
	#[cfg(unix)]
	unsafe {
		for signal in STOP_SIGNALS {
			libc::signal(signal, on_signal as libc::sighandler_t);
		}
	}
}

/// Ignores further stop signals while the ledger is being written.
pub fn suppress() {
	#[cfg(unix)]
	unsafe {
		for signal in STOP_SIGNALS {
			libc::signal(signal, libc::SIG_IGN);
		}
	}
}

/// Hands stop signals back to the default disposition, which terminates.
pub fn restore_default() {
	#[cfg(unix)]
	unsafe {
		for signal in STOP_SIGNALS {
			libc::signal(signal, libc::SIG_DFL);
		}
	}
}

pub fn request() {
	REQUESTED.store(true, Ordering::SeqCst);
}

pub fn is_requested() -> bool {
	REQUESTED.load(Ordering::SeqCst)
}

/// Blocks until a stop is requested. There is no timeout.
pub fn wait(poll: Duration) {
	while !is_requested() {
		thread::sleep(poll);
	}
}
