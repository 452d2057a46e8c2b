pub mod cli;
pub mod services;
pub mod web;
