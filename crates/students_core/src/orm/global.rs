//! Process-wide session factory handle.
//!
//! # Invariants
//! - The first successful `init_session_factory` wins; later calls return it.
//! - `close_session_factory` is meant for the shutdown path only.

use super::session_factory::SessionFactory;
use crate::db::{ConnectionProvider, DbResult};
use once_cell::sync::OnceCell;

static SESSION_FACTORY: OnceCell<SessionFactory> = OnceCell::new();

/// Builds the process session factory on first call.
pub fn init_session_factory(provider: ConnectionProvider) -> DbResult<&'static SessionFactory> {
    SESSION_FACTORY.get_or_try_init(|| SessionFactory::build(provider))
}

/// Returns the process session factory, if initialized.
pub fn session_factory() -> Option<&'static SessionFactory> {
    SESSION_FACTORY.get()
}

/// Closes the process session factory when one was initialized.
pub fn close_session_factory() {
    if let Some(factory) = SESSION_FACTORY.get() {
        factory.close();
    }
}
