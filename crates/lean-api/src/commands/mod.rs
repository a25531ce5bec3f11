pub mod completions;
pub mod logout;
pub mod remember;
pub mod request;
