//! Caselook - court-by-court export crawler for the Caselook case-law portal.
//!
//! Walks every selected court backwards through time, collecting one export
//! link per date window until the configured cutoff, and persists each link
//! as an item in a JSON lines manifest.

pub mod catalogue;
pub mod config;
pub mod crawl;
pub mod models;
pub mod scrapers;
pub mod services;
pub mod storage;
