mod beam;
pub mod louds_lm;
pub mod params;
