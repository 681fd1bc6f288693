#![warn(missing_docs)]
//! # This projects library
//!
//! This library simulates a single elevator dispatch engine: calls come in, their pickup and
//! drop-off stops are inserted where they add the least travel, and a timed state machine
//! drives the car through them while keeping passengers and requests in step.
//!
//! ## Overview
//! - **Config**: Handles configuration settings and timing.
//! - **Model**: The elevator, its stops, passengers and requests.
//! - **Manager**: Cost based stop insertion.
//! - **Elevator Logic**: Dispatch loop, movement and arrival handling.
//! - **Registry**: Owns the elevators and exposes the commands and queries.
//! - **Persistence**: Best-effort store writes through a background worker.
//! - **Init**: Argument parsing and system start-up.

/// Global variables
pub mod config;

/// Initialize functions
pub mod init;

/// Print functions with color coding
pub mod print;

pub mod model;

pub mod manager;

pub mod elevator_logic;

pub mod registry;

pub mod persistence;
