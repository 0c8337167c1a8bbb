pub mod bbmap;
pub mod config;
pub mod discovery;
pub mod gffcompare;
pub mod idhist;
pub mod model;
pub mod qcml;
pub mod readqc;
