pub mod corpus;
pub mod history;
pub mod model;

pub use corpus::*;
pub use history::*;
pub use model::*;
