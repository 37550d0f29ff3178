mod helpers;
mod import;
mod log;
mod summary;
mod view;

pub(crate) use import::{cmd_export, cmd_import};
pub(crate) use log::{ReplacePolicy, cmd_delete, cmd_log};
pub(crate) use summary::cmd_stats;
pub(crate) use view::{cmd_chart, cmd_view, view_count};
