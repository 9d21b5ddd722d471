pub mod mapper;
pub mod types;

pub use mapper::{description_column, map_columns, normalize_column_name, ColumnMap, ROLE_TABLE};
pub use types::{Binding, Matcher, Role};
