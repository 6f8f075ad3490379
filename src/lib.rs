//! Cascading dotfile overlay and installation engine.
//!
//! Dotfiles live in a source tree split into groups (`base/`,
//! `machines/desktop/`, ...). The active groups are layered in order to
//! decide what each destination file contains, and the result is installed
//! into the install root with a lockfile recording what was written.
//!
//! The public API is organised into layers:
//!
//! - **[`config`]**: load and sanitize the source configuration and lockfile
//! - **[`resolver`]**: map source files onto destination dotfiles
//! - **[`installer`]**: prepare, install, run install scripts, finalize
//! - **[`commands`]**: top-level subcommand orchestration (`install`, `files`, `diff`, `config`)
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod exec;
pub mod installer;
pub mod logging;
pub mod output;
pub mod resolver;
