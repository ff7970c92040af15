pub mod adx;
pub mod heikin_ashi;
pub mod resample;
