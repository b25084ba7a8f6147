use crate::database::target::{BusinessKey, Entity};
use crate::database::types::{Row, SqlValue};
use crate::error::{Error, Result};
use crate::jobs::{FromSourceRow, InsertMapper, UpsertMapper};
use crate::version::Version;
use chrono::{NaiveDate, NaiveTime};

/// Target record in the `course` table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Course {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub version: Version,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub location: Option<String>,
}

impl Entity for Course {
    const KIND: &'static str = "course";
    const TABLE: &'static str = "course";
    const COLUMNS: &'static [&'static str] = &["name", "date", "time", "location"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn value(&self, column: &str) -> Option<SqlValue> {
        Some(match column {
            "name" => self.name.clone().into(),
            "date" => self.date.into(),
            "time" => self.time.into(),
            "location" => self.location.clone().into(),
            _ => return None,
        })
    }

    fn clear(&mut self, column: &str) -> Result<()> {
        match column {
            "name" => self.name = None,
            "date" => self.date = None,
            "time" => self.time = None,
            "location" => self.location = None,
            other => return Err(Error::invalid_input(format!("course has no column '{}'", other))),
        }
        Ok(())
    }

    fn set_key(&mut self, key: &BusinessKey) -> Result<()> {
        for (column, value) in key.parts() {
            let value = value.clone();
            match *column {
                "name" => self.name = Some(value),
                "location" => self.location = Some(value),
                other => {
                    return Err(Error::invalid_input(format!(
                        "course has no text column '{}'",
                        other
                    )))
                }
            }
        }
        Ok(())
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: Some(row.int("id")?),
            name: row.opt_text("name")?,
            version: row.version("version")?,
            date: row.opt_date("date")?,
            time: row.opt_time("time")?,
            location: row.opt_text("location")?,
        })
    }
}

/// Row of the legacy `course` table (positions: 1 name, 5 location)
///
/// Read by column name; only the table itself can be remapped.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyCourse {
    pub name: Option<String>,
    pub location: Option<String>,
}

impl FromSourceRow for LegacyCourse {
    fn from_source_row(row: &Row) -> Result<Self> {
        Ok(Self {
            name: row.opt_text("name")?,
            location: row.opt_text("location")?,
        })
    }
}

fn name_key(source: &LegacyCourse) -> Option<BusinessKey> {
    source
        .name
        .as_ref()
        .map(|name| BusinessKey::new("name", name.as_str()))
}

/// 1.0.0: course names
pub struct CourseImport;

impl InsertMapper for CourseImport {
    type Source = LegacyCourse;
    type Target = Course;

    fn business_key(&self, source: &LegacyCourse) -> Option<BusinessKey> {
        name_key(source)
    }

    fn map(&self, source: LegacyCourse) -> Course {
        Course {
            name: source.name,
            ..Default::default()
        }
    }
}

/// 2.0.0: course locations, matched on name
pub struct CourseLocationRevision;

impl UpsertMapper for CourseLocationRevision {
    type Source = LegacyCourse;
    type Target = Course;

    fn fields(&self) -> &'static [&'static str] {
        &["location"]
    }

    fn business_key(&self, source: &LegacyCourse) -> Result<BusinessKey> {
        name_key(source).ok_or_else(|| Error::mapping("name", "business key is null"))
    }

    fn revise(&self, source: LegacyCourse, target: &mut Course) {
        target.location = source.location;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_maps_name_only() {
        let row = Row::new()
            .with("id", 1i64)
            .with("name", "Algebra")
            .with("location", "Room 4");
        let course = CourseImport.map(LegacyCourse::from_source_row(&row).unwrap());
        assert_eq!(course.name.as_deref(), Some("Algebra"));
        assert_eq!(course.location, None);
    }

    #[test]
    fn test_missing_location_column_is_a_mapping_error() {
        let row = Row::new().with("id", 1i64).with("name", "Algebra");
        let err = LegacyCourse::from_source_row(&row).unwrap_err();
        assert!(matches!(err, Error::Mapping { ref column, .. } if column == "location"));
    }

    #[test]
    fn test_clear_unknown_column() {
        let mut course = Course::default();
        assert!(course.clear("location").is_ok());
        assert!(course.clear("teacher").is_err());
    }
}
