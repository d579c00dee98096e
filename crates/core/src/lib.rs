#![deny(rust_2018_idioms)]

pub mod commands;
pub mod config;

#[macro_use]
extern crate bitflags;
