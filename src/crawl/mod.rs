//! Crawl orchestration: per-court state machine and the coordinator that
//! runs it across the catalogue.

mod components;
mod coordinator;
pub mod dates;
mod driver;
mod error;
mod harvest;
pub mod query;
mod seen;
mod session;
mod window;

pub use components::{
    Authenticator, CrawlComponents, LinkHarvester, PageProbe, ResultConfirmer, ResultsView,
    SearchSubmitter,
};
pub use coordinator::{CrawlCoordinator, CrawlSummary};
pub use dates::{
    earliest_in_listing, find_earliest_date, format_portal_date, parse_document_date, parse_portal_date,
    DateParseError, ListedDocument, ResultsListing,
};
pub use driver::{CourtCrawlDriver, CourtCrawlReport, CrawlPhase, DriverSettings, Termination};
pub use error::{CrawlError, Result};
pub use harvest::poll_for_new_link;
pub use query::{build_search_payload, parse_search_response, QueryFilters, SearchHandle};
pub use seen::SeenLinks;
pub use session::PortalSession;
pub use window::{decide_after_probe, CrawlWindow, ProbeDecision};
