mod dispute;
mod event_log;
mod receipt;
mod settings;
mod share_token;

pub use dispute::*;
pub use event_log::*;
pub use receipt::*;
pub use settings::*;
pub use share_token::*;
