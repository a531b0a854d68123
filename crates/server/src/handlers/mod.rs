//! HTTP request handlers.

pub mod counter;
pub mod health;
pub mod pages;

pub use counter::*;
pub use health::*;
pub use pages::*;
