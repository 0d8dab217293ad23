pub mod assembler;
pub mod geometry;
pub mod http;
pub mod power;
pub mod pvgis;
pub mod sizing;
