pub mod http_client;
pub mod stub_http;

pub use http_client::ReqwestHttp;
pub use stub_http::{RecordedRequest, StubHttp};
