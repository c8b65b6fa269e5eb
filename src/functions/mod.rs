// Pipeline stages, one module per concern
pub mod colormap;
pub mod grid;
pub mod latex;
pub mod math;
pub mod sanitize;
pub mod simplify;
pub mod surface;
