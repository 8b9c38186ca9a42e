//! Building, launching and reading `codex exec` invocations.

mod collector;
mod command;
mod events;
mod options;
mod process;
mod stream;
mod timeout;

pub use collector::*;
pub use command::*;
pub use events::*;
pub use options::*;
pub use process::*;
pub use stream::*;
pub use timeout::*;
