//! Keeps a local playback backend and a remote coordination session in step.
//!
//! Backends implement [`capability::PlayerCapability`] and feed their native
//! status through a [`translator::TranslatorHandle`]. The [`synchronizer::Synchronizer`]
//! owns the session state and is the only place it changes.

pub mod api;
pub mod capability;
pub mod error;
pub mod events;
pub mod session;
pub mod synchronizer;
pub mod throttle;
pub mod translator;
pub mod transport;

#[cfg(test)]
mod testing;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
