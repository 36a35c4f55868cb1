pub mod building;
pub mod member;
pub mod results;
pub mod template;
pub mod voting;

pub use building::*;
pub use member::*;
pub use results::*;
pub use template::*;
pub use voting::*;
