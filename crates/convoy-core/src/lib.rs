pub mod converge;
pub mod discovery;
pub mod error;
pub mod model;
pub mod parser;
pub mod run;
pub mod runtime;

pub use converge::*;
pub use discovery::*;
pub use error::*;
pub use model::*;
pub use parser::*;
pub use run::*;
pub use runtime::*;
