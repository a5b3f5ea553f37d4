//! Decoding raw vCard text into contact records.

use time::macros::format_description;
use time::Date;
use vcard4::property::{AddressProperty, TextOrUriProperty, TextProperty};
use vcard4::{parse, Vcard};

use crate::contact::{ContactRecord, PostalAddress};
use crate::error::{Error, Result};

/// Parse a payload holding any number of vCards, in payload order.
pub fn decode(input: &str) -> Result<Vec<ContactRecord>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }

    let cards = parse(input).map_err(|err| Error::Decode(err.to_string()))?;
    cards.iter().map(to_record).collect()
}

fn to_record(card: &Vcard) -> Result<ContactRecord> {
    let fullname = display_name(card);
    let uid = card_uid(card)
        .filter(|uid| !uid.trim().is_empty())
        .ok_or_else(|| Error::Decode(format!("contact `{fullname}` has no UID")))?;

    let birthday = card.bday.as_ref().and_then(|bday| {
        let raw = bday.to_string();
        let parsed = parse_birthday(&raw);
        if parsed.is_none() {
            tracing::warn!(%uid, bday = %raw, "ignoring birthday without a full date");
        }
        parsed
    });

    let notes: Vec<&str> = card
        .note
        .iter()
        .map(|n| n.value.trim())
        .filter(|n| !n.is_empty())
        .collect();

    Ok(ContactRecord {
        uid,
        fullname,
        birthday,
        telephones: card.tel.iter().map(tel_value).collect(),
        emails: card.email.iter().map(|e| e.value.trim().to_string()).collect(),
        addresses: card.address.iter().map(postal_address).collect(),
        note: if notes.is_empty() {
            None
        } else {
            Some(notes.join("\n"))
        },
    })
}

/// Retrieve the UID value as a string if present.
pub fn card_uid(card: &Vcard) -> Option<String> {
    match &card.uid {
        Some(TextOrUriProperty::Text(text)) => Some(text.value.clone()),
        Some(TextOrUriProperty::Uri(uri)) => Some(uri.value.to_string()),
        None => None,
    }
}

// Lowest PREF wins; ties keep the first FN.
fn display_name(card: &Vcard) -> String {
    let mut best: Option<&TextProperty> = None;
    let mut best_pref = u8::MAX;

    for prop in &card.formatted_name {
        let pref = prop
            .parameters
            .as_ref()
            .and_then(|p| p.pref)
            .unwrap_or(u8::MAX);
        if best.is_none() || pref < best_pref {
            best = Some(prop);
            best_pref = pref;
        }
    }

    best.map(|p| p.value.trim().to_string()).unwrap_or_default()
}

fn tel_value(prop: &TextOrUriProperty) -> String {
    let raw = match prop {
        TextOrUriProperty::Text(text) => text.value.clone(),
        TextOrUriProperty::Uri(uri) => uri.value.to_string(),
    };
    strip_tel_scheme(raw.trim()).to_string()
}

fn strip_tel_scheme(value: &str) -> &str {
    match value.get(..4) {
        Some(scheme) if scheme.eq_ignore_ascii_case("tel:") => value[4..].trim(),
        _ => value,
    }
}

fn postal_address(prop: &AddressProperty) -> PostalAddress {
    let adr = &prop.value;
    let street: Vec<&str> = [&adr.extended_address, &adr.street_address]
        .into_iter()
        .filter_map(|part| part.as_deref())
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    PostalAddress {
        street: if street.is_empty() {
            None
        } else {
            Some(street.join("\n"))
        },
        locality: adr.locality.clone(),
        region: adr.region.clone(),
        postal_code: adr.postal_code.clone(),
        country: adr.country_name.clone(),
    }
}

/// Accept `YYYYMMDD` or `YYYY-MM-DD`, ignoring any time part.
fn parse_birthday(raw: &str) -> Option<Date> {
    let date_part = raw.trim().split('T').next()?;
    if date_part.starts_with("--") {
        return None;
    }
    let digits: String = date_part.chars().filter(|c| *c != '-').collect();
    if digits.len() != 8 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Date::parse(&digits, format_description!("[year][month][day]")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    #[test]
    fn test_decode_full_card() {
        let input = "BEGIN:VCARD
VERSION:4.0
FN:Arletha Johnson
UID:ab2
BDAY:19850412
TEL:773-340-6525
EMAIL:arletha@example.com
ADR:;Suite 239;12845 Ali Fords;New Walton;MS;79297;
NOTE:Met at the conference
END:VCARD
";
        let records = decode(input).unwrap();
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.uid, "ab2");
        assert_eq!(record.fullname, "Arletha Johnson");
        assert_eq!(
            record.birthday,
            Some(Date::from_calendar_date(1985, Month::April, 12).unwrap())
        );
        assert_eq!(record.telephones, vec!["773-340-6525".to_string()]);
        assert_eq!(record.emails, vec!["arletha@example.com".to_string()]);
        assert_eq!(record.note.as_deref(), Some("Met at the conference"));
        assert_eq!(
            record.addresses[0].one_line(),
            "Suite 239, 12845 Ali Fords, New Walton, MS 79297"
        );
    }

    #[test]
    fn test_decode_keeps_payload_order() {
        let input = "BEGIN:VCARD
VERSION:4.0
FN:Rubin Kuhn
UID:ab4
END:VCARD
BEGIN:VCARD
VERSION:4.0
FN:Matthew Robert
UID:ab8
EMAIL:matthew@example.com
EMAIL:matt@example.com
END:VCARD
";
        let records = decode(input).unwrap();
        let uids: Vec<_> = records.iter().map(|r| r.uid.as_str()).collect();
        assert_eq!(uids, vec!["ab4", "ab8"]);
        assert_eq!(records[0].birthday, None);
        assert!(records[0].telephones.is_empty());
        assert_eq!(records[1].emails.len(), 2);
    }

    #[test]
    fn test_decode_prefers_lowest_pref_fn() {
        let input = "BEGIN:VCARD
VERSION:4.0
FN;PREF=2:Bob Roberts
FN;PREF=1:Robert Roberts
FN:Bobby
UID:ab5
END:VCARD
";
        let records = decode(input).unwrap();
        assert_eq!(records[0].fullname, "Robert Roberts");
    }

    #[test]
    fn test_decode_requires_uid() {
        let input = "BEGIN:VCARD
VERSION:4.0
FN:No Identifier
END:VCARD
";
        assert!(matches!(decode(input), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_empty_payload() {
        assert!(decode("").unwrap().is_empty());
        assert!(decode("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_birthday_forms() {
        let expected = Date::from_calendar_date(1985, Month::April, 12).ok();
        assert_eq!(parse_birthday("19850412"), expected);
        assert_eq!(parse_birthday("1985-04-12"), expected);
        assert_eq!(parse_birthday("19850412T101500Z"), expected);
        assert_eq!(parse_birthday("--0412"), None);
        assert_eq!(parse_birthday("circa 1985"), None);
    }

    #[test]
    fn test_strip_tel_scheme() {
        assert_eq!(strip_tel_scheme("tel:+1-555-0100"), "+1-555-0100");
        assert_eq!(strip_tel_scheme("TEL:+1-555-0100"), "+1-555-0100");
        assert_eq!(strip_tel_scheme("555-0100"), "555-0100");
        assert_eq!(strip_tel_scheme("tel"), "tel");
    }
}
