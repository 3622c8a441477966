pub mod icons;
pub mod output;
pub mod progress;
pub mod progress_message;
pub mod table;
pub mod theme;

pub use icons::Icons;
pub use output::{
    failure_report, header, info, section, statement, status, success, summary_row, warn,
};
pub use progress::RunProgress;
pub use progress_message::ProgressMessage;
pub use table::TableBuilder;
pub use theme::{err_theme, theme, Theme};
