pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod controller;
pub mod fragment;
pub mod output;
pub mod panel;
pub mod search;

#[cfg(test)]
mod tests;
