/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! Firmware for a motor-driven analog dial clock appliance.
//!
//! Every independent concern (clock, alarms, audio, buttons, power, motor
//! control, persistence, shell, watchdog) is a service owning one node on
//! the [`databroker`] bus. Services never call each other directly; they
//! talk through publish / notify / pull with the [`message::Message`] enum
//! as the shared payload type, and hardware is reached only through the
//! [`hal`] traits injected at construction.
//!
//! ```text
//! lib.rs
//! ├── message.rs  – the closed Message enum, one variant per node family
//! ├── config.rs   – YAML application configuration
//! ├── hal/        – peripheral traits, host implementations
//! ├── service/    – one module per bus node
//! └── app.rs      – topology assembly and the cooperative run loop
//! ```

pub mod app;
pub mod config;
pub mod hal;
pub mod message;
pub mod service;
