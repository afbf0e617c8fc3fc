//! Required-field and enumerated-value checks for guest submissions.

use std::fmt;

use thiserror::Error;
use time::{Date, macros::format_description};

use crate::db::{Association, NewGuest};

pub const BRIDE_CONNECTIONS: [&str; 4] = ["Kalyani", "Kalyan", "Anjan & Raji", "Harini"];
pub const GROOM_CONNECTIONS: [&str; 5] = [
    "Ramesh",
    "Sushma",
    "Nirupama & Abhijit",
    "Brij Mohan",
    "Aditya",
];

/// Placeholder the registration form sends for fields left empty.
const NULL_SENTINEL: &str = "null";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("Association must be either bride or groom")]
    InvalidAssociation,

    #[error("Invalid connection for {0}")]
    InvalidConnection(Association),

    #[error("{0} must be a date in YYYY-MM-DD format")]
    InvalidDate(&'static str),
}

impl Association {
    pub fn connections(self) -> &'static [&'static str] {
        match self {
            Association::Bride => &BRIDE_CONNECTIONS,
            Association::Groom => &GROOM_CONNECTIONS,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bride" => Some(Association::Bride),
            "groom" => Some(Association::Groom),
            _ => None,
        }
    }
}

impl fmt::Display for Association {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Association::Bride => "bride",
            Association::Groom => "groom",
        })
    }
}

/// Text fields of a registration exactly as the client sent them.
#[derive(Debug, Clone, Default)]
pub struct GuestSubmission {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub association: Option<String>,
    pub connection: Option<String>,
    pub date_of_birth: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
}

impl GuestSubmission {
    /// Checks name, association and connection in that order and reports the first problem.
    ///
    /// Blank and `"null"` values count as absent. The returned guest has no media attached.
    pub fn validate(self) -> Result<NewGuest, ValidationError> {
        let name = present(self.name).ok_or(ValidationError::Missing("name"))?;
        let association = present(self.association).ok_or(ValidationError::Missing("association"))?;
        let connection = present(self.connection).ok_or(ValidationError::Missing("connection"))?;

        let association =
            Association::parse(&association).ok_or(ValidationError::InvalidAssociation)?;
        if !association.connections().contains(&connection.as_str()) {
            return Err(ValidationError::InvalidConnection(association));
        }

        let date_of_birth = present(self.date_of_birth)
            .map(|raw| parse_date("date_of_birth", &raw))
            .transpose()?;

        Ok(NewGuest {
            name,
            email: present(self.email),
            phone: present(self.phone),
            association,
            connection,
            photo_url: None,
            date_of_birth,
            location: present(self.location),
            bio: present(self.bio),
            voice_note_url: None,
        })
    }
}

/// `None` for absent, blank, or sentinel values.
pub fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| {
        let v = v.trim();
        !v.is_empty() && v != NULL_SENTINEL
    })
}

pub fn parse_date(field: &'static str, raw: &str) -> Result<Date, ValidationError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValidationError::InvalidDate(field))
}
