mod file_backed;
mod hosted_api;
mod http_local;

pub use file_backed::FileBackedAdapter;
pub use hosted_api::HostedApiAdapter;
pub use http_local::HttpLocalAdapter;
