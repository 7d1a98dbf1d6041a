pub mod cnet;
pub mod techcrunch;
pub mod wired;

pub use cnet::CnetScraper;
pub use techcrunch::TechCrunchScraper;
pub use wired::WiredScraper;

/// Category stamped on every record from the technology sources
pub const CATEGORY: &str = "tech";
