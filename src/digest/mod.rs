mod grouping;
mod render;

pub use grouping::OrderedMultimap;
pub use render::{Digest, DigestSection};
