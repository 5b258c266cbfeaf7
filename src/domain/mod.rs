pub mod board;
pub mod card;
pub mod guard;
pub mod lifecycle;
pub mod ordering;
pub mod record;
pub mod snapshot;

pub use board::{default_boards, Board, BoardId};
pub use card::{Card, CardId, CardIdGenerator};
pub use lifecycle::CardState;
pub use record::DeletedRecord;
pub use snapshot::{Collection, Snapshot};
