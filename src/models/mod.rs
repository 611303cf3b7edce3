mod alert;
mod callback;
mod feed;
mod object;

pub use alert::Alert;
pub use callback::{CallbackPayload, MatchEvent};
pub use feed::Feed;
pub use object::{IndexObject, NewIndexObject, NewTrigger, ObjectMetadata, Trigger};
