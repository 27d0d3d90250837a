pub mod dispatch;
pub mod token;

pub use dispatch::dispatch;
