pub mod batch;
pub mod crud;
pub mod dispatch;
pub mod health;
pub mod lab;
pub mod query;
pub mod resource;
pub mod stats;
pub mod test_case;
pub mod token;
pub mod version;

pub use batch::BatchHandler;
pub use health::health;
pub use lab::LabHandler;
pub use query::ListQuery;
pub use resource::{RequestContext, ResourceHandler, ResourceRegistry};
pub use stats::StatisticsHandler;
pub use test_case::TestCaseHandler;
pub use token::TokenHandler;
pub use version::VersionHandler;
