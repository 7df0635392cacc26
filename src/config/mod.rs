pub mod settings;

pub use settings::{EndpointSettings, Settings};
