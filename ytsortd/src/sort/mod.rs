pub mod apply;
pub mod collection;
pub mod driver;
pub mod duration;
pub mod engine;
pub mod enrich;
pub mod plan;
pub mod remote;

#[cfg(test)]
mod test_support;
