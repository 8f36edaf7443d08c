//! External collaborators of the patrol engine.
//!
//! The engine only sees the traits; `CredentialAuthProvider` and
//! `HttpDownloader` are the built-in implementations. Screenshot capture
//! needs a browser and is always supplied by the embedding application.

mod auth;
mod downloader;
mod observer;
mod traits;

pub use auth::CredentialAuthProvider;
pub use downloader::HttpDownloader;
pub use observer::{ChannelObserver, ResultObserver};
pub use traits::{AuthContext, AuthProvider, CaptureMode, Downloader, ScreenshotService};
