pub mod icons;
pub mod output;
pub mod progress;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{dim, header, info, result_row, success, warn};
pub use progress::{IngestProgress, Spinner};
pub use table::{stats_table, TableBuilder};
pub use theme::{theme, Theme};
