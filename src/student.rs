//! Student domain record and the field selector used by draft edits.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    core::store::StoreError,
    types::{Gender, StudentId},
};

/// One student entry as held in the roster.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StudentRecord {
    /// Store-assigned identity.
    pub id: StudentId,
    /// Free-form name.
    pub name: String,
    /// Free-form email address.
    pub email: String,
    /// Free-form mobile number.
    pub mobile: String,
    /// Gender choice, `Male` unless set.
    pub gender: Gender,
    /// Date of birth as entered, unvalidated.
    pub dob: String,
    /// Free-form postal address.
    pub address: String,
}

impl StudentRecord {
    /// Blank record carrying only `id`.
    pub fn blank(id: StudentId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Returns the current value of `field` as text.
    pub fn field(&self, field: StudentField) -> &str {
        match field {
            StudentField::Id => self.id.as_str(),
            StudentField::Name => &self.name,
            StudentField::Email => &self.email,
            StudentField::Mobile => &self.mobile,
            StudentField::Gender => self.gender.as_str(),
            StudentField::Dob => &self.dob,
            StudentField::Address => &self.address,
        }
    }

    /// Overwrites one editable field. The identity is never writable here.
    pub fn set_field(&mut self, field: StudentField, value: &str) -> Result<(), StoreError> {
        match field {
            StudentField::Id => return Err(StoreError::ImmutableField(field)),
            StudentField::Name => self.name = value.to_string(),
            StudentField::Email => self.email = value.to_string(),
            StudentField::Mobile => self.mobile = value.to_string(),
            StudentField::Gender => {
                self.gender = value
                    .parse()
                    .map_err(|()| StoreError::InvalidFieldValue {
                        field,
                        value: value.to_string(),
                    })?;
            }
            StudentField::Dob => self.dob = value.to_string(),
            StudentField::Address => self.address = value.to_string(),
        }
        Ok(())
    }
}

/// Addressable attribute of a [`StudentRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StudentField {
    /// Identity, read-only.
    Id,
    /// Name.
    Name,
    /// Email.
    Email,
    /// Mobile number.
    Mobile,
    /// Gender.
    Gender,
    /// Date of birth.
    Dob,
    /// Address.
    Address,
}

impl StudentField {
    /// Every field in form order.
    pub const ALL: [StudentField; 7] = [
        Self::Id,
        Self::Name,
        Self::Email,
        Self::Mobile,
        Self::Gender,
        Self::Dob,
        Self::Address,
    ];

    /// Form input name of this field.
    pub fn name(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Email => "email",
            Self::Mobile => "mobile",
            Self::Gender => "gender",
            Self::Dob => "dob",
            Self::Address => "address",
        }
    }
}

impl fmt::Display for StudentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StudentField {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|field| field.name() == s)
            .ok_or_else(|| StoreError::UnknownField(s.to_string()))
    }
}
