pub mod address;
pub mod records;
pub mod token;
pub mod venue;

pub use address::*;
pub use records::*;
pub use token::*;
pub use venue::*;
