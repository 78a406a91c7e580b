pub mod aggregate;
pub mod cli;
pub mod config;
pub mod lifecycle;
pub mod monitor;
pub mod redfish;
pub mod report;
pub mod sampler;
pub mod source;

#[cfg(test)]
pub mod test_support;
