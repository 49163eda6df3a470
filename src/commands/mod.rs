pub mod cartridge;
pub mod completions;
pub mod config;
pub mod doctor;
pub mod key;
pub mod memory;
pub mod render;
