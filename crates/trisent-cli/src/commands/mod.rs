pub mod dataset;
pub mod pipeline;
pub mod remote;
