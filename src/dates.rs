//! Calendar dates travel as plain `YYYY-MM-DD` strings in JSON and query strings.

use time::{format_description::BorrowedFormatItem, macros::format_description, Date};

pub const ISO_DATE: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn parse_date(raw: &str) -> Result<Date, time::error::Parse> {
    Date::parse(raw.trim(), ISO_DATE)
}

pub mod iso_date {
    use serde::{de, ser, Deserialize, Deserializer, Serializer};
    use time::Date;

    use super::{parse_date, ISO_DATE};

    pub fn serialize<S: Serializer>(date: &Date, s: S) -> Result<S::Ok, S::Error> {
        let out = date.format(ISO_DATE).map_err(ser::Error::custom)?;
        s.serialize_str(&out)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Date, D::Error> {
        let raw = String::deserialize(d)?;
        parse_date(&raw).map_err(de::Error::custom)
    }

    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(date: &Option<Date>, s: S) -> Result<S::Ok, S::Error> {
            match date {
                Some(d) => super::serialize(d, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Date>, D::Error> {
            match Option::<String>::deserialize(d)? {
                Some(raw) if !raw.trim().is_empty() => {
                    parse_date(&raw).map(Some).map_err(de::Error::custom)
                }
                _ => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use time::macros::date;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Holder {
        #[serde(with = "iso_date")]
        day: Date,
        #[serde(default, with = "iso_date::option")]
        maybe: Option<Date>,
    }

    #[test]
    fn serializes_as_plain_iso_string() {
        let h = Holder {
            day: date!(2026 - 03 - 07),
            maybe: None,
        };
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, r#"{"day":"2026-03-07","maybe":null}"#);
    }

    #[test]
    fn blank_optional_date_is_none() {
        let h: Holder = serde_json::from_str(r#"{"day":"2026-12-31","maybe":""}"#).unwrap();
        assert_eq!(h.day, date!(2026 - 12 - 31));
        assert_eq!(h.maybe, None);
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(parse_date("2026-02-30").is_err());
        assert!(parse_date("yesterday").is_err());
    }
}
