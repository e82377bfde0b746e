//! Foodloop
//!
//! Foodloop is the session core of a surplus-food marketplace: a guarded
//! navigation state machine for customers and business partners, the
//! reservation lifecycle from checkout to pickup, and cart totals.

pub mod cart;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod orders;
pub mod prelude;
pub mod roles;
pub mod screens;
pub mod session;
pub mod timers;
