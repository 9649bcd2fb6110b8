mod protocol;
pub use protocol::{Protocol, ProtocolParseError};

mod route;
pub use route::{Route, RouteAction};

mod table;
pub use table::Table;

mod search;
pub use search::SearchPath;

/// Name of a route table inside the store.
pub type TableName = String;
