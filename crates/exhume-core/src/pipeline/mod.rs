pub mod config;
pub mod driver;

pub use config::DebugConfig;
pub use driver::AstBackend;
