pub mod app;
pub mod command;
pub mod config;
pub mod repl;

#[cfg(test)]
pub(crate) mod testing;

