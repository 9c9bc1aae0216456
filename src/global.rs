//! Process-wide default container for applications that can't pass one around.
//!
//! Nothing is installed initially. Prefer passing a [`Container`] explicitly,
//! the global one is only a convenience for entry points.

use parking_lot::{const_mutex, Mutex};
use tracing::debug;

use crate::sync::Container;

static DEFAULT: Mutex<Option<Container>> = const_mutex(None);

/// Installs the container as the global one, returning the previously installed container.
pub fn install(container: Container) -> Option<Container> {
    debug!(container = %container.id(), "Global container installed");
    DEFAULT.lock().replace(container)
}

/// Returns a handle to the global container, if one is installed.
#[must_use]
pub fn get() -> Option<Container> {
    DEFAULT.lock().clone()
}

/// Uninstalls the global container and returns it.
pub fn take() -> Option<Container> {
    let container = DEFAULT.lock().take();
    if container.is_some() {
        debug!("Global container uninstalled");
    }
    container
}
