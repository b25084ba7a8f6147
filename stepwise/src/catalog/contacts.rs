use crate::database::target::{BusinessKey, Entity};
use crate::database::types::{Row, SqlValue};
use crate::error::{Error, Result};
use crate::jobs::{FromSourceRow, InsertMapper};
use crate::version::Version;

/// Target record in the `contact` table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contact {
    pub id: Option<i64>,
    pub first_name: Option<String>,
    pub version: Version,
    pub last_name: Option<String>,
    pub company: Option<String>,
}

impl Entity for Contact {
    const KIND: &'static str = "contact";
    const TABLE: &'static str = "contact";
    const COLUMNS: &'static [&'static str] = &["first_name", "last_name", "company"];

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
            "first_name" => self.first_name.clone().into(),
            "last_name" => self.last_name.clone().into(),
            "company" => self.company.clone().into(),
            _ => return None,
        })
    }

    fn clear(&mut self, column: &str) -> Result<()> {
        match column {
            "first_name" => self.first_name = None,
            "last_name" => self.last_name = None,
            "company" => self.company = None,
            other => return Err(Error::invalid_input(format!("contact has no column '{}'", other))),
        }
        Ok(())
    }

    fn set_key(&mut self, key: &BusinessKey) -> Result<()> {
        for (column, value) in key.parts() {
            let value = value.clone();
            match *column {
                "first_name" => self.first_name = Some(value),
                "last_name" => self.last_name = Some(value),
                "company" => self.company = Some(value),
                other => {
                    return Err(Error::invalid_input(format!(
                        "contact has no text column '{}'",
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
            first_name: row.opt_text("first_name")?,
            version: row.version("version")?,
            last_name: row.opt_text("last_name")?,
            company: row.opt_text("company")?,
        })
    }
}

/// Row of the legacy `contact` table (positions: 1 first_name, 3 last_name)
///
/// Columns are read by their legacy names; configuration can move the
/// table but not rename its columns.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl FromSourceRow for LegacyContact {
    fn from_source_row(row: &Row) -> Result<Self> {
        Ok(Self {
            first_name: row.opt_text("first_name")?,
            last_name: row.opt_text("last_name")?,
        })
    }
}

/// 1.0.0: contact names, keyed on first and last name together
///
/// A contact missing either name has no key and is inserted on every run.
pub struct ContactImport;

impl InsertMapper for ContactImport {
    type Source = LegacyContact;
    type Target = Contact;

    fn business_key(&self, source: &LegacyContact) -> Option<BusinessKey> {
        let first_name = source.first_name.as_ref()?;
        let last_name = source.last_name.as_ref()?;
        Some(
            BusinessKey::new("first_name", first_name.as_str())
                .and("last_name", last_name.as_str()),
        )
    }

    fn map(&self, source: LegacyContact) -> Contact {
        Contact {
            first_name: source.first_name,
            last_name: source.last_name,
            ..Default::default()
        }
    }
}
