pub mod batch;
pub mod download;
pub mod error;
pub mod naming;
pub mod outcome;
pub mod paths;
pub mod revision;
pub mod store;
pub mod upload;

#[cfg(test)]
mod testing;
