#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
#![warn(clippy::perf)]
#![warn(clippy::complexity)]
#![warn(clippy::style)]
#![allow(clippy::multiple_crate_versions)]

pub mod addon;
pub mod cache;
pub mod config;
pub mod error;
pub mod playlist;
pub mod server;
pub mod source;
pub mod util;
