//! High-level services combining the pure core with the repository.

pub mod digest_service;
pub mod observation_service;
pub mod twilight;

pub use digest_service::DigestService;
pub use twilight::{night_window, sun_altitude, TwilightBound};
