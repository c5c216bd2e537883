//! Food dataset reader.
//!
//! The dataset is a CSV file with a header row. Recognized columns:
//!
//! ```text
//! name,diningHall,calories,image_path
//! Pizza,Gordon,450,
//! Caesar Salad,Four Lakes,220,photos/caesar.jpg
//! Tofu Stir Fry,Rheta's,n/a,NA
//! ```
//!
//! ## Leniency
//!
//! A row never fails on content. Every recognized column is optional and
//! unknown columns are ignored:
//!
//! - Missing or blank `name` → `Item {row}` (0-based row index)
//! - Missing or blank `diningHall` → `Unknown Hall`
//! - `calories` accepts integers and decimals (`450.0` → 450); anything
//!   else, including negatives, becomes 0
//! - Short rows are accepted; missing trailing cells count as absent
//!
//! ## Failures
//!
//! Only file-level problems are errors, and each one aborts the whole load:
//! a missing file, a file with no data rows, or bytes the CSV parser cannot
//! read (invalid UTF-8, unbalanced quoting).

use crate::types::RawItem;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const NAME_COLUMN: &str = "name";
pub const DINING_HALL_COLUMN: &str = "diningHall";
pub const CALORIES_COLUMN: &str = "calories";
pub const IMAGE_PATH_COLUMN: &str = "image_path";

const UNKNOWN_HALL: &str = "Unknown Hall";

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset not found: {0}")]
    Missing(PathBuf),
    #[error("Dataset has no rows: {0}")]
    Empty(PathBuf),
    #[error("Malformed dataset {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Column positions resolved from the header row.
#[derive(Debug, Clone, Copy, Default)]
struct Columns {
    name: Option<usize>,
    dining_hall: Option<usize>,
    calories: Option<usize>,
    image_path: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Self {
        let find = |wanted: &str| headers.iter().position(|h| h.trim() == wanted);
        Self {
            name: find(NAME_COLUMN),
            dining_hall: find(DINING_HALL_COLUMN),
            calories: find(CALORIES_COLUMN),
            image_path: find(IMAGE_PATH_COLUMN),
        }
    }

    fn raw_item(&self, row: usize, record: &csv::StringRecord) -> RawItem {
        let cell = |col: Option<usize>| col.and_then(|i| record.get(i));
        let text = |col: Option<usize>| cell(col).filter(|s| !s.trim().is_empty());

        RawItem {
            name: text(self.name)
                .map(String::from)
                .unwrap_or_else(|| format!("Item {row}")),
            dining_hall: text(self.dining_hall)
                .map(String::from)
                .unwrap_or_else(|| UNKNOWN_HALL.to_string()),
            calories: parse_calories(cell(self.calories)),
            image_path: cell(self.image_path).map(String::from),
        }
    }
}

/// An opened dataset whose rows are read lazily.
pub struct Dataset {
    path: PathBuf,
    columns: Columns,
    reader: csv::Reader<File>,
}

impl Dataset {
    /// Open the CSV file and read its header row.
    pub fn open(path: &Path) -> Result<Self, DatasetError> {
        if !path.is_file() {
            return Err(DatasetError::Missing(path.to_path_buf()));
        }
        let file = File::open(path)?;
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
        let headers = reader
            .headers()
            .map_err(|e| malformed(path, &e))?
            .clone();
        if headers.is_empty() {
            return Err(DatasetError::Empty(path.to_path_buf()));
        }

        Ok(Self {
            path: path.to_path_buf(),
            columns: Columns::from_headers(&headers),
            reader,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iterate over the data rows in file order.
    ///
    /// A parser failure is yielded as [`DatasetError::Malformed`]; callers
    /// are expected to abandon the load when they see one.
    pub fn items(self) -> impl Iterator<Item = Result<RawItem, DatasetError>> {
        let Self {
            path,
            columns,
            reader,
        } = self;
        reader
            .into_records()
            .enumerate()
            .map(move |(row, record)| match record {
                Ok(record) => Ok(columns.raw_item(row, &record)),
                Err(e) => Err(malformed(&path, &e)),
            })
    }
}

/// Read every row of the dataset.
///
/// Fails with [`DatasetError::Empty`] when the file has a header but no rows.
pub fn read_dataset(path: &Path) -> Result<Vec<RawItem>, DatasetError> {
    let items = Dataset::open(path)?
        .items()
        .collect::<Result<Vec<_>, _>>()?;
    if items.is_empty() {
        return Err(DatasetError::Empty(path.to_path_buf()));
    }
    Ok(items)
}

/// Parse a calories cell into a non-negative integer, defaulting to 0.
pub fn parse_calories(cell: Option<&str>) -> u32 {
    let Some(value) = cell.map(str::trim).filter(|s| !s.is_empty()) else {
        return 0;
    };
    if let Ok(n) = value.parse::<u32>() {
        return n;
    }
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => v.trunc().min(f64::from(u32::MAX)) as u32,
        _ => 0,
    }
}

fn malformed(path: &Path, err: &csv::Error) -> DatasetError {
    DatasetError::Malformed {
        path: path.to_path_buf(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::write_dataset;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn reads_all_columns() {
        let tmp = TempDir::new().unwrap();
        let path = write_dataset(
            tmp.path(),
            "name,diningHall,calories,image_path\n\
             Pizza,Gordon,450,\n\
             Caesar Salad,Four Lakes,220,photos/caesar.jpg\n",
        );

        let items = read_dataset(&path).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Pizza");
        assert_eq!(items[0].dining_hall, "Gordon");
        assert_eq!(items[0].calories, 450);
        assert_eq!(items[0].image_path.as_deref(), Some(""));
        assert_eq!(items[1].image_path.as_deref(), Some("photos/caesar.jpg"));
    }

    #[test]
    fn one_bad_calorie_value_does_not_fail_the_load() {
        let tmp = TempDir::new().unwrap();
        let path = write_dataset(
            tmp.path(),
            "name,diningHall,calories\n\
             Pizza,Gordon,450\n\
             Tofu,Rheta's,lots\n\
             Soup,Carson's,90\n",
        );

        let items = read_dataset(&path).unwrap();
        let calories: Vec<u32> = items.iter().map(|i| i.calories).collect();
        assert_eq!(calories, vec![450, 0, 90]);
    }

    #[test]
    fn missing_columns_use_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = write_dataset(tmp.path(), "calories\n100\n");

        let items = read_dataset(&path).unwrap();
        assert_eq!(items[0].name, "Item 0");
        assert_eq!(items[0].dining_hall, "Unknown Hall");
        assert_eq!(items[0].image_path, None);
    }

    #[test]
    fn blank_cells_use_defaults() {
        let tmp = TempDir::new().unwrap();
        let path = write_dataset(
            tmp.path(),
            "name,diningHall,calories\nPizza,Gordon,1\n,,\n",
        );

        let items = read_dataset(&path).unwrap();
        assert_eq!(items[1].name, "Item 1");
        assert_eq!(items[1].dining_hall, "Unknown Hall");
        assert_eq!(items[1].calories, 0);
    }

    #[test]
    fn short_rows_are_accepted() {
        let tmp = TempDir::new().unwrap();
        let path = write_dataset(
            tmp.path(),
            "name,diningHall,calories,image_path\nPizza,Gordon\n",
        );

        let items = read_dataset(&path).unwrap();
        assert_eq!(items[0].calories, 0);
        assert_eq!(items[0].image_path, None);
    }

    #[test]
    fn unknown_columns_and_order_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let path = write_dataset(
            tmp.path(),
            "station,calories,diningHall,name\nGrill,300,Gordon,Burger\n",
        );

        let items = read_dataset(&path).unwrap();
        assert_eq!(items[0].name, "Burger");
        assert_eq!(items[0].dining_hall, "Gordon");
        assert_eq!(items[0].calories, 300);
    }

    #[test]
    fn quoted_cells_keep_commas() {
        let tmp = TempDir::new().unwrap();
        let path = write_dataset(
            tmp.path(),
            "name,diningHall,calories\n\"Mac, Cheese\",Gordon,500\n",
        );

        let items = read_dataset(&path).unwrap();
        assert_eq!(items[0].name, "Mac, Cheese");
    }

    #[test]
    fn missing_file_is_missing() {
        let tmp = TempDir::new().unwrap();
        let result = read_dataset(&tmp.path().join("nope.csv"));
        assert!(matches!(result, Err(DatasetError::Missing(_))));
    }

    #[test]
    fn zero_byte_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = write_dataset(tmp.path(), "");
        assert!(matches!(read_dataset(&path), Err(DatasetError::Empty(_))));
    }

    #[test]
    fn header_only_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let path = write_dataset(tmp.path(), "name,diningHall,calories,image_path\n");
        assert!(matches!(read_dataset(&path), Err(DatasetError::Empty(_))));
    }

    #[test]
    fn invalid_utf8_is_malformed() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("foods.csv");
        fs::write(&path, b"name,diningHall\nPi\xffza,Gordon\n").unwrap();
        assert!(matches!(
            read_dataset(&path),
            Err(DatasetError::Malformed { .. })
        ));
    }

    #[test]
    fn items_are_lazy_and_ordered() {
        let tmp = TempDir::new().unwrap();
        let path = write_dataset(tmp.path(), "name,diningHall\nA,X\nB,Y\nC,Z\n");

        let dataset = Dataset::open(&path).unwrap();
        assert_eq!(dataset.path(), path.as_path());
        let first_two: Vec<String> = dataset
            .items()
            .take(2)
            .map(|r| r.unwrap().name)
            .collect();
        assert_eq!(first_two, vec!["A", "B"]);
    }

    #[test]
    fn parse_calories_variants() {
        assert_eq!(parse_calories(Some("450")), 450);
        assert_eq!(parse_calories(Some(" 450 ")), 450);
        assert_eq!(parse_calories(Some("450.0")), 450);
        assert_eq!(parse_calories(Some("99.9")), 99);
        assert_eq!(parse_calories(Some("-5")), 0);
        assert_eq!(parse_calories(Some("nan")), 0);
        assert_eq!(parse_calories(Some("inf")), 0);
        assert_eq!(parse_calories(Some("lots")), 0);
        assert_eq!(parse_calories(Some("")), 0);
        assert_eq!(parse_calories(None), 0);
    }
}
