//! The two streaming contracts every tabular resource implements: the
//! pull-based select side and the batched push-based insert side, plus the
//! shared cursor/batch bookkeeping both sides build on.

pub mod insert;
pub mod listener;
pub mod select;

pub use insert::{BatchTracker, InsertOptions, InsertStream};
pub use listener::StreamListener;
pub use select::{Cursor, SelectStream};
