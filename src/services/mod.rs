//! Service layer for image I/O and remote source fetching

pub mod fetch;
pub mod io;

pub use fetch::{HttpFetcher, SourceFetcher, StaticFetcher};
pub use io::ImageIOService;
