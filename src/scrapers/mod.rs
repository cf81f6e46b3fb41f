//! Portal access: browser automation, HTTP calls and the Caselook steps
//! built on them.

pub mod browser;
#[cfg(feature = "browser")]
pub mod caselook;
pub mod http_client;

#[cfg(feature = "browser")]
pub use browser::PortalBrowser;
pub use browser::{BrowserCookie, BrowserEngineConfig};
#[cfg(feature = "browser")]
pub use caselook::{CaselookPortal, PortalSettings};
pub use http_client::{HttpClient, HttpResponse, ACCEPT_LANGUAGE, USER_AGENT};
