pub mod contract;
pub mod framework;
pub mod recommendation;
pub mod record;
