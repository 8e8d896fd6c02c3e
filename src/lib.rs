pub mod basic;
pub mod snr;
pub mod timer;
