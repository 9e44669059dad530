pub mod auth;

pub use auth::{authenticate, extract_token_from_headers, remote_ip, Credentials};
