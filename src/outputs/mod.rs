//! Stand-in speech backends for the console driver and tests.

pub mod console;
pub mod scripted;

pub use console::{ConsoleCapture, ConsoleSynthesizer, ListeningFlag};
pub use scripted::{ScriptStep, ScriptedCapture};
