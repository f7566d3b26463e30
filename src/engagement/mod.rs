//! 互动候选：搜索、选择标准、打分选择

pub mod criteria;
pub mod search;
pub mod selector;

pub use criteria::SelectionCriteria;
pub use search::{expand_queries, merge_candidates, CandidateSearch, SearchMode, SearchOptions};
pub use selector::{parse_selection, CandidateSelector, Selection};
