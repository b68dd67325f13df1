mod bracket;
mod page;
mod tournament_list;

pub use bracket::*;
pub use page::*;
pub use tournament_list::*;
