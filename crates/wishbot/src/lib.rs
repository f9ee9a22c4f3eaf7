//! Wishbot - HTTP API and Telegram front-end of the wish-list Mini-App
//!
//! Storage, configuration and initData verification live in `wishcore`;
//! this crate wires them to the outside world.

pub mod api;
pub mod cli;
pub mod telegram;
