pub mod client;
pub mod response;

pub use client::{HttpClient, HttpResponse, ReqwestClient};
pub use response::{LevelResponse, Verification};
