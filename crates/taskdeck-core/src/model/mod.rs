mod chat;
mod task;

pub use chat::*;
pub use task::*;

#[cfg(test)]
mod tests;
