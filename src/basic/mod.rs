pub mod eph;
pub mod func;
pub mod interp;
pub mod pos;
pub mod read;
pub mod sat;
pub mod sp3;
pub mod time;
pub mod var;
