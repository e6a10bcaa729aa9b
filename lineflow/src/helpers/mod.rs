//! Free helpers: bounded fan-out, task ownership and small stateless utilities.

mod extras;
mod parallel;
pub mod task;

pub use extras::{cat, command, nproc, sleep, split};
pub use parallel::{xargs, xargs_iter};
