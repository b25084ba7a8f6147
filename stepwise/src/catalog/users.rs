use crate::database::target::{BusinessKey, Entity};
use crate::database::types::{Row, SqlValue};
use crate::error::{Error, Result};
use crate::jobs::{FromSourceRow, InsertMapper, UpsertMapper};
use crate::version::Version;
use chrono::NaiveDate;

/// Target record in the `users` table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub version: Version,
    pub birth_date: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub job: Option<String>,
    pub email: Option<String>,
}

impl Entity for User {
    const KIND: &'static str = "user";
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &[
        "birth_date",
        "phone_number",
        "first_name",
        "last_name",
        "city",
        "job",
        "email",
    ];

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
            "birth_date" => self.birth_date.into(),
            "phone_number" => self.phone_number.clone().into(),
            "first_name" => self.first_name.clone().into(),
            "last_name" => self.last_name.clone().into(),
            "city" => self.city.clone().into(),
            "job" => self.job.clone().into(),
            "email" => self.email.clone().into(),
            _ => return None,
        })
    }

    fn clear(&mut self, column: &str) -> Result<()> {
        match column {
            "birth_date" => self.birth_date = None,
            "phone_number" => self.phone_number = None,
            "first_name" => self.first_name = None,
            "last_name" => self.last_name = None,
            "city" => self.city = None,
            "job" => self.job = None,
            "email" => self.email = None,
            other => return Err(Error::invalid_input(format!("users has no column '{}'", other))),
        }
        Ok(())
    }

    fn set_key(&mut self, key: &BusinessKey) -> Result<()> {
        for (column, value) in key.parts() {
            let value = value.clone();
            match *column {
                "phone_number" => self.phone_number = Some(value),
                "first_name" => self.first_name = Some(value),
                "last_name" => self.last_name = Some(value),
                "city" => self.city = Some(value),
                "job" => self.job = Some(value),
                "email" => self.email = Some(value),
                other => {
                    return Err(Error::invalid_input(format!(
                        "users has no text column '{}'",
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
            version: row.version("version")?,
            birth_date: row.opt_date("birth_date")?,
            phone_number: row.opt_text("phone_number")?,
            first_name: row.opt_text("first_name")?,
            last_name: row.opt_text("last_name")?,
            city: row.opt_text("city")?,
            job: row.opt_text("job")?,
            email: row.opt_text("email")?,
        })
    }
}

/// Row of the legacy `user` table
///
/// Legacy column positions: 3 phone_number, 4 first_name, 5 last_name,
/// 6 city, 7 job, 8 email. They are read by name, so the source table must
/// keep these column names even when `[source.tables.user]` moves it.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyUser {
    pub phone_number: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub city: Option<String>,
    pub job: Option<String>,
    pub email: Option<String>,
}

impl FromSourceRow for LegacyUser {
    fn from_source_row(row: &Row) -> Result<Self> {
        Ok(Self {
            phone_number: row.opt_text("phone_number")?,
            first_name: row.opt_text("first_name")?,
            last_name: row.opt_text("last_name")?,
            city: row.opt_text("city")?,
            job: row.opt_text("job")?,
            email: row.opt_text("email")?,
        })
    }
}

/// 1.0.0: names, city, job and email
pub struct UserImport;

impl InsertMapper for UserImport {
    type Source = LegacyUser;
    type Target = User;

    fn business_key(&self, source: &LegacyUser) -> Option<BusinessKey> {
        source
            .email
            .as_ref()
            .map(|email| BusinessKey::new("email", email.as_str()))
    }

    fn map(&self, source: LegacyUser) -> User {
        User {
            first_name: source.first_name,
            last_name: source.last_name,
            city: source.city,
            job: source.job,
            email: source.email,
            ..Default::default()
        }
    }
}

/// 1.1.0: phone numbers, matched on email
pub struct UserPhoneRevision;

impl UpsertMapper for UserPhoneRevision {
    type Source = LegacyUser;
    type Target = User;

    fn fields(&self) -> &'static [&'static str] {
        &["phone_number"]
    }

    fn business_key(&self, source: &LegacyUser) -> Result<BusinessKey> {
        source
            .email
            .as_ref()
            .map(|email| BusinessKey::new("email", email.as_str()))
            .ok_or_else(|| Error::mapping("email", "business key is null"))
    }

    fn revise(&self, source: LegacyUser, target: &mut User) {
        target.phone_number = source.phone_number;
    }
}
