pub mod browser;
pub mod consolidate;
pub mod extractor;
pub mod harvester;
pub mod listing;
pub mod traits;
pub mod types;
pub mod url_builder;

pub use browser::{ChromeLauncher, ChromeSession};
pub use consolidate::{consolidate, consolidate_tables, LinkSet};
pub use extractor::{BatchSummary, DetailExtractor, LinkOutcome};
pub use harvester::LinkHarvester;
pub use listing::parse_listing;
pub use traits::{PageSession, SessionFactory};
pub use types::{ExtractOptions, HarvestOptions, PaginationPolicy, SortStrategy};
pub use url_builder::build_page_url;
