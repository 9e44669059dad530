pub mod response;

pub use response::{HandlerResponse, ResponseError, JSON_CONTENT_TYPE};
