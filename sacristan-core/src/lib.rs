mod batch;
mod document;
mod live;
mod query;
mod store;
mod util;
mod value;

pub use batch::*;
pub use document::*;
pub use live::*;
pub use query::*;
pub use store::*;
pub use util::*;
pub use value::*;
