//! Built-in vendor platform definitions.

pub mod brocade_fastiron;
pub mod cisco_ios;
pub mod hp_comware;
pub mod hp_procurve;
