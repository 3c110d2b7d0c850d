//! Helper functions shared by the loader, the generator and template filters

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
