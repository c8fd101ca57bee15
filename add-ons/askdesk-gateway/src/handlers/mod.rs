//! HTTP handlers. Every route delegates to the shared [`crate::AppState`].

pub(crate) mod chat;
pub(crate) mod session;
