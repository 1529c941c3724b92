pub mod highlight;
pub mod index;
pub mod page;
pub mod store;
pub mod tokenizer;

pub use index::{IndexStats, InvertedIndex, ScoredPage};
pub use page::PageRecord;
pub use store::{replay_into, PageStore, SledPageStore};
