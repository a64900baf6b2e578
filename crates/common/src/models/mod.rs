mod assignment;

pub use assignment::TunnelAssignment;
