pub mod config;
pub mod eval;
pub mod mem;
pub mod mongo;
pub mod session;
pub mod snapshot;
pub mod traits;

pub use config::{connect, ExplorerConfig};
pub use mem::InMemoryGateway;
pub use mongo::MongoGateway;
pub use session::{Explain, Session};
pub use traits::*;
