//! Snapshot table layout.
//!
//! A snapshot is three rows sharing one column set:
//!
//! | row | content |
//! |---|---|
//! | data | counts |
//! | legend | area ids under the `COL_<i>_` columns |
//! | label | human-readable names for every column |
//!
//! The column set is a fixed prefix followed by one `COL_<i>_` column per
//! area and one `DEP_<i>_` column per department, both 1-indexed and
//! truncated to [`ColumnLimits`]. Consumers read the label and legend rows
//! to interpret the dynamic columns.

use chrono::NaiveDateTime;
use syncloc_occupancy_models::{AreaType, CycleAggregate};

/// Format of the `UPDATE_TIME_` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fixed columns and their labels, in table order. `UPDATE_TIME_` is
/// listed first and carries the timestamp in every row.
pub const FIXED_COLUMNS: [(&str, &str); 11] = [
    ("UPDATE_TIME_", "Update time"),
    ("TOTAL_AREA_", "Total areas"),
    ("TOTAL_SITE_", "Total sites"),
    ("TOTAL_LOC_", "In-well persons"),
    ("TOTAL_VEHICLE_", "Total vehicles"),
    ("INWELL_VEHICLE_", "In-well vehicles"),
    ("LEAVE_", "Left network"),
    ("AREA_1_", "Area type 1 persons"),
    ("AREA_2_", "Area type 2 persons"),
    ("AREA_3_", "Area type 3 persons"),
    ("AREA_4_", "Area type 4 persons"),
];

/// Maximum number of dynamic columns of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLimits {
    /// Maximum `COL_<i>_` columns.
    pub areas: usize,
    /// Maximum `DEP_<i>_` columns.
    pub departments: usize,
}

/// An area as it appears in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AreaColumn<'a> {
    /// Area id, written to the legend row.
    pub id: &'a str,
    /// Area name, written to the label row and used to look up the count.
    pub name: &'a str,
}

/// One column with its value in each of the three rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Value in the data row.
    pub data: String,
    /// Value in the legend row.
    pub legend: String,
    /// Value in the label row.
    pub label: String,
}

/// A rendered snapshot ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    columns: Vec<Column>,
}

/// Inputs for [`Snapshot::build`] that come from the reference cache.
#[derive(Debug, Clone, Copy)]
pub struct Reference<'a> {
    /// Areas in display order.
    pub areas: &'a [AreaColumn<'a>],
    /// Departments in display order.
    pub departments: &'a [&'a str],
    /// Number of known sites.
    pub site_count: usize,
}

impl Snapshot {
    /// Lays out `aggregate` as a snapshot taken at `at`.
    ///
    /// `TOTAL_AREA_` reports every known area even when the dynamic columns
    /// are truncated.
    #[must_use]
    pub fn build(
        aggregate: &CycleAggregate,
        reference: Reference<'_>,
        limits: ColumnLimits,
        at: NaiveDateTime,
    ) -> Self {
        let timestamp = at.format(TIMESTAMP_FORMAT).to_string();

        let fixed_values = [
            reference.areas.len() as u64,
            reference.site_count as u64,
            aggregate.inwell_person_count,
            aggregate.vehicle_count,
            aggregate.inwell_vehicle_count,
            aggregate.leave_person_count,
            aggregate.area_type_counts.get(AreaType::One),
            aggregate.area_type_counts.get(AreaType::Two),
            aggregate.area_type_counts.get(AreaType::Three),
            aggregate.area_type_counts.get(AreaType::Four),
        ];

        let mut columns = Vec::with_capacity(
            FIXED_COLUMNS.len()
                + limits.areas.min(reference.areas.len())
                + limits.departments.min(reference.departments.len()),
        );

        let (time_name, _) = FIXED_COLUMNS[0];
        columns.push(Column {
            name: time_name.to_string(),
            data: timestamp.clone(),
            legend: timestamp.clone(),
            label: timestamp,
        });

        for ((name, label), value) in FIXED_COLUMNS[1..].iter().zip(fixed_values) {
            columns.push(Column {
                name: (*name).to_string(),
                data: value.to_string(),
                legend: String::new(),
                label: (*label).to_string(),
            });
        }

        for (i, area) in reference.areas.iter().take(limits.areas).enumerate() {
            let count = aggregate
                .area_person_count
                .get(area.name)
                .copied()
                .unwrap_or(0);
            columns.push(Column {
                name: area_column(i + 1),
                data: count.to_string(),
                legend: area.id.to_string(),
                label: area.name.to_string(),
            });
        }

        for (i, department) in reference
            .departments
            .iter()
            .take(limits.departments)
            .enumerate()
        {
            let count = aggregate
                .dept_person_count
                .get(*department)
                .copied()
                .unwrap_or(0);
            columns.push(Column {
                name: department_column(i + 1),
                data: count.to_string(),
                legend: String::new(),
                label: (*department).to_string(),
            });
        }

        Self { columns }
    }

    /// Columns in table order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in table order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// The data, legend, and label rows.
    #[must_use]
    pub fn rows(&self) -> [Vec<&str>; 3] {
        [
            self.columns.iter().map(|c| c.data.as_str()).collect(),
            self.columns.iter().map(|c| c.legend.as_str()).collect(),
            self.columns.iter().map(|c| c.label.as_str()).collect(),
        ]
    }

    /// A multi-row `INSERT` for `table` with `$n` placeholders, to be bound
    /// with [`Self::rows`] flattened in order.
    ///
    /// Column identifiers are generated from the fixed names and integer
    /// indexes only; `table` must already be validated.
    #[must_use]
    pub fn insert_sql(&self, table: &str) -> String {
        let width = self.columns.len();
        let mut sql = format!("INSERT INTO {table} (");
        sql.push_str(&self.column_names().collect::<Vec<_>>().join(", "));
        sql.push_str(") VALUES ");

        let rows: Vec<String> = (0..3)
            .map(|row| {
                let placeholders: Vec<String> = (0..width)
                    .map(|col| format!("${}", row * width + col + 1))
                    .collect();
                format!("({})", placeholders.join(", "))
            })
            .collect();
        sql.push_str(&rows.join(", "));

        sql
    }
}

/// Name of the `n`th (1-indexed) area column.
#[must_use]
pub fn area_column(n: usize) -> String {
    format!("COL_{n}_")
}

/// Name of the `n`th (1-indexed) department column.
#[must_use]
pub fn department_column(n: usize) -> String {
    format!("DEP_{n}_")
}

/// `CREATE TABLE IF NOT EXISTS` for a snapshot table able to hold
/// `limits` dynamic columns. Every column is text since the legend and
/// label rows share it with the counts.
#[must_use]
pub fn create_table_sql(table: &str, limits: ColumnLimits) -> String {
    let columns: Vec<String> = FIXED_COLUMNS
        .iter()
        .map(|(name, _)| (*name).to_string())
        .chain((1..=limits.areas).map(area_column))
        .chain((1..=limits.departments).map(department_column))
        .map(|name| format!("{name} VARCHAR(255)"))
        .collect();

    format!(
        "CREATE TABLE IF NOT EXISTS {table} ({})",
        columns.join(", ")
    )
}

/// Whether `table` is safe to splice into SQL as an identifier: ASCII
/// letters, digits and underscores, optionally schema-qualified with a
/// single dot, not starting with a digit.
#[must_use]
pub fn is_valid_table_name(table: &str) -> bool {
    let valid_part = |part: &str| {
        part.chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    match table.split_once('.') {
        Some((schema, name)) => valid_part(schema) && valid_part(name),
        None => valid_part(table),
    }
}
