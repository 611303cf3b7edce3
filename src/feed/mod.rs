mod probe;

pub use probe::{FeedProbe, HttpFeedProbe, MAX_FEED_URL_LEN};
