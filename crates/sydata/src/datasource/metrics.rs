//! Datasource metrics.
//!
//! The constants defined in this module are the names of metrics that the
//! datasources maintain via [`metrics`] crate interfaces.
use ::metrics::{describe_counter, Unit};

/// Total number of columns written with their values.
pub const COLUMNS_WRITTEN: &str = "sydata.total_columns_written";

/// Total number of rows of the columns written with their values.
pub const ROWS_WRITTEN: &str = "sydata.total_rows_written";

/// Total number of columns linked instead of written.
pub const COLUMNS_TRANSFERRED: &str = "sydata.total_columns_transferred";

/// Total number of column attribute writes.
pub const COLUMN_ATTRIBUTES_WRITTEN: &str = "sydata.total_column_attributes_written";

/// Total number of table attribute writes.
pub const TABLE_ATTRIBUTES_WRITTEN: &str = "sydata.total_table_attributes_written";

/// Total number of table name writes.
pub const NAMES_WRITTEN: &str = "sydata.total_names_written";

/// Total number of containers linked instead of written.
pub const GROUPS_LINKED: &str = "sydata.total_groups_linked";

/// Total number of text writes.
pub const TEXTS_WRITTEN: &str = "sydata.total_texts_written";

/// Adds descriptions for the metrics we expose.
pub(super) fn describe_datasource_metrics() {
    describe_counter!(COLUMNS_WRITTEN, "total number of columns written");
    describe_counter!(
        ROWS_WRITTEN,
        Unit::Count,
        "total number of rows of the columns written"
    );
    describe_counter!(COLUMNS_TRANSFERRED, "total number of columns linked");
    describe_counter!(
        COLUMN_ATTRIBUTES_WRITTEN,
        "total number of column attribute writes"
    );
    describe_counter!(
        TABLE_ATTRIBUTES_WRITTEN,
        "total number of table attribute writes"
    );
    describe_counter!(NAMES_WRITTEN, "total number of table name writes");
    describe_counter!(GROUPS_LINKED, "total number of containers linked");
    describe_counter!(TEXTS_WRITTEN, "total number of text writes");
}
