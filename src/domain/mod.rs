// Domain layer: request parameters, wire types and ports. No I/O here.

pub mod model;
pub mod ports;
