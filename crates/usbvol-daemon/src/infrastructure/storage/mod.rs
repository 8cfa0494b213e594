//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the `KEY=VALUE` file at
//! `/etc/default/usbvol` and falls back to built-in defaults when the file
//! does not exist.  The daemon never writes configuration back.

pub mod config;
