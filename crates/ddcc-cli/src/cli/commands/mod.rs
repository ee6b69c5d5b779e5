pub mod detect;
mod dispatch;
pub(crate) mod input;
pub(crate) mod registry;
pub mod trust;
pub mod verify;

pub use dispatch::dispatch;
