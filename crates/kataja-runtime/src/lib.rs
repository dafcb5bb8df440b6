#![forbid(unsafe_code)]

//! The interactive half of Kataja: animation, commands and input.
//!
//! [`Kataja`] owns the forests and ties them to a [`kataja_core::Viewport`].
//! The host feeds it [`kataja_core::ViewportEvent`]s and timer ticks, and
//! drains [`HostRequest`]s for things only the host can do.
//!
//! ```
//! use kataja_core::HeadlessViewport;
//! use kataja_runtime::{CommandArgs, Context, Kataja};
//!
//! let mut k = Kataja::new(Context::with_viewport(HeadlessViewport::default()));
//! k.execute("add_constituent_node", &CommandArgs::text("dog")).unwrap();
//! k.run_until_idle(100);
//! assert!(!k.scheduler().is_running());
//! assert_eq!(k.execute("undo", &CommandArgs::default()).unwrap(), "Undo: Added constituent dog");
//! ```

mod builtin;
pub mod command;
pub mod context;
pub mod engine;
pub mod error;
pub mod scheduler;

pub use command::{Command, CommandArgs, CommandFn, CommandRegistry, Invocation, Predicate, WidgetId};
pub use context::Context;
pub use engine::{HostRequest, Kataja, NodeStyle};
pub use error::{CommandError, Result};
pub use scheduler::{AnimationScheduler, TickSummary};
