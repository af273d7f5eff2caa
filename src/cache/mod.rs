// Trace cache: per-call-site entry lists and the process-wide registry.
pub mod entry;
pub mod registry;
pub mod site;

pub use entry::CacheEntry;
pub use registry::{CacheConfig, CacheRegistry, global};
pub use site::{CallSite, CallSiteId, CallSiteStats, SiteState};
