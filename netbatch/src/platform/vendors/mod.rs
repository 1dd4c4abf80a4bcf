//! Built-in vendor command tables.

pub mod cisco;
pub mod h3c;
pub mod huawei;
