pub mod pool;
pub mod tree;

pub use pool::IdentifierPool;
pub use tree::Tree;
