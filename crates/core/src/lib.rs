pub mod config;
pub mod error;
pub mod template;
pub mod window;

pub use config::Config;
pub use error::*;
pub use template::*;
pub use window::DateWindow;
