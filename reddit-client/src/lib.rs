pub mod discovery;
pub mod extractor;
pub mod listing;
pub mod permalink;

mod tests;

pub use discovery::{Discovery, DiscoveryPage, ExhaustionReason};
pub use extractor::{ContentExtractor, KeywordMatcher};
pub use listing::{RedditListing, RedditListingChild, RedditListingData, RedditThingData};
pub use permalink::Permalink;
