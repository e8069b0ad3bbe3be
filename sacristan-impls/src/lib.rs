mod stores;

pub use stores::*;
