pub mod health;
pub mod request;
pub mod service;
pub mod status;
pub mod topology;

pub use health::*;
pub use request::*;
pub use service::*;
pub use status::*;
pub use topology::*;
