use polis_db::models;
use rust_decimal::Decimal;

/// The `?search=` query string shared by every listing page.
#[derive(Debug, serde::Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

/// Validation messages collected per form, each attached to the input that
/// caused it; the empty field name carries form-level messages.
#[derive(Debug, Default)]
pub struct FieldErrors(Vec<(&'static str, String)>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push((field, message.into()));
    }

    /// The first message for a field, or the empty string, so templates can
    /// render the error slot unconditionally.
    pub fn get(&self, field: &str) -> &str {
        self.0
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, message)| message.as_str())
            .unwrap_or("")
    }

    pub fn any(&self) -> bool {
        !self.0.is_empty()
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum AmountError {
    Invalid,
    OutOfRange,
}

/// Parses a submitted monetary amount and checks it against an inclusive
/// range; both product payments and claim damages go through here.
pub fn parse_amount(text: &str, min: i64, max: i64) -> Result<Decimal, AmountError> {
    let amount = text
        .trim()
        .parse::<Decimal>()
        .map_err(|_| AmountError::Invalid)?;
    if amount < Decimal::from(min) || amount > Decimal::from(max) {
        return Err(AmountError::OutOfRange);
    }
    Ok(amount)
}

pub fn parse_date(text: &str) -> Option<jiff::civil::Date> {
    text.trim().parse().ok()
}

pub fn today() -> jiff::civil::Date {
    jiff::Zoned::now().date()
}

pub fn in_future(date: jiff::civil::Date) -> bool {
    date > today()
}

/// One dropdown entry; `value` is the row id as submitted by the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

pub fn insurance_label(insured_object: &str, description: &str) -> String {
    format!("{insured_object} - {description}")
}

/// Labels longer than 50 characters are clipped to 47 plus an ellipsis so
/// the dropdown stays readable.
pub fn clipped(label: String) -> String {
    if label.chars().count() > 50 {
        let mut short = label.chars().take(47).collect::<String>();
        short.push_str("...");
        short
    } else {
        label
    }
}

pub fn placeholder() -> SelectOption {
    SelectOption {
        value: "0".to_owned(),
        label: "-- select an insurance --".to_owned(),
    }
}

/// The product dropdown for agreeing a contract: every product, labeled
/// `<object> - <description>`.
pub fn product_options(products: &[models::Insurance]) -> Vec<SelectOption> {
    products
        .iter()
        .map(|product| SelectOption {
            value: product.id.to_string(),
            label: insurance_label(&product.insured_object, &product.description),
        })
        .collect()
}

/// The contract dropdown for recording a claim: the person's contracts with
/// clipped labels, behind a non-selectable placeholder. Create and every
/// re-render after a validation failure build the list through here.
pub fn contract_options(
    contracts: &[(models::AgreedInsurance, models::Insurance)],
) -> Vec<SelectOption> {
    let mut options = vec![placeholder()];
    options.extend(contracts.iter().map(|(contract, product)| SelectOption {
        value: contract.id.to_string(),
        label: clipped(insurance_label(
            &product.insured_object,
            &product.description,
        )),
    }));
    options
}

/// Percent-encodes a query-string value; e-mails land in redirect URLs and
/// may carry `+` or other reserved characters.
pub fn urlencode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char)
            }
            other => encoded.push_str(&format!("%{other:02X}")),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i32, insured_object: &str, description: &str) -> models::Insurance {
        let now = jiff::Timestamp::now().into();
        models::Insurance {
            id,
            insured_object: insured_object.to_owned(),
            description: description.to_owned(),
            annual_payment: Decimal::from(5_000),
            created: now,
            updated: now,
        }
    }

    fn contract(id: i32, insurance_id: i32) -> models::AgreedInsurance {
        let now = jiff::Timestamp::now().into();
        models::AgreedInsurance {
            id,
            insurance_id,
            insured_person_id: 7,
            establishment_date: jiff::civil::date(2026, 1, 15).into(),
            valid_to: jiff::civil::date(2027, 1, 15).into(),
            active: true,
            created: now,
            updated: now,
        }
    }

    #[test]
    fn amounts_inside_the_inclusive_bounds_are_accepted() {
        assert_eq!(
            parse_amount("1000", 1_000, 1_000_000),
            Ok(Decimal::from(1_000))
        );
        assert_eq!(
            parse_amount("1000000", 1_000, 1_000_000),
            Ok(Decimal::from(1_000_000))
        );
        assert_eq!(
            parse_amount(" 10000000 ", 1_000, 10_000_000),
            Ok(Decimal::from(10_000_000))
        );
        assert_eq!(
            parse_amount("5000.50", 1_000, 1_000_000),
            Ok("5000.50".parse().unwrap())
        );
    }

    #[test]
    fn amounts_outside_the_bounds_are_rejected() {
        assert_eq!(
            parse_amount("999.99", 1_000, 1_000_000),
            Err(AmountError::OutOfRange)
        );
        assert_eq!(
            parse_amount("1000000.01", 1_000, 1_000_000),
            Err(AmountError::OutOfRange)
        );
        assert_eq!(
            parse_amount("10000001", 1_000, 10_000_000),
            Err(AmountError::OutOfRange)
        );
    }

    #[test]
    fn unparsable_amounts_are_rejected() {
        assert_eq!(parse_amount("", 1_000, 1_000_000), Err(AmountError::Invalid));
        assert_eq!(
            parse_amount("five thousand", 1_000, 1_000_000),
            Err(AmountError::Invalid)
        );
    }

    #[test]
    fn dates_parse_and_future_dates_are_detected() {
        assert_eq!(parse_date("2026-03-03"), Some(jiff::civil::date(2026, 3, 3)));
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
        assert!(!in_future(today()));
        assert!(in_future(today().tomorrow().unwrap()));
        assert!(!in_future(today().yesterday().unwrap()));
    }

    #[test]
    fn labels_at_fifty_characters_stay_and_longer_ones_clip() {
        let exact = "x".repeat(50);
        assert_eq!(clipped(exact.clone()), exact);
        let long = "y".repeat(51);
        let clipped_label = clipped(long);
        assert_eq!(clipped_label.chars().count(), 50);
        assert!(clipped_label.ends_with("..."));
        assert!(clipped_label.starts_with(&"y".repeat(47)));
    }

    #[test]
    fn contract_options_lead_with_the_placeholder() {
        let rows = vec![(contract(3, 1), product(1, "Car", "Collision"))];
        let options = contract_options(&rows);
        assert_eq!(options[0], placeholder());
        assert_eq!(options[1].value, "3");
        assert_eq!(options[1].label, "Car - Collision");
    }

    #[test]
    fn product_options_carry_no_placeholder_and_no_clipping() {
        let long_description = "d".repeat(80);
        let rows = vec![product(9, "House", &long_description)];
        let options = product_options(&rows);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].value, "9");
        assert_eq!(options[0].label, format!("House - {long_description}"));
    }

    #[test]
    fn field_errors_keep_the_first_message_per_field() {
        let mut errors = FieldErrors::default();
        assert!(!errors.any());
        assert_eq!(errors.get("email"), "");
        errors.add("email", "first");
        errors.add("email", "second");
        errors.add("", "form level");
        assert!(errors.any());
        assert_eq!(errors.get("email"), "first");
        assert_eq!(errors.get(""), "form level");
    }

    #[test]
    fn reserved_characters_in_query_values_are_percent_encoded() {
        assert_eq!(urlencode("jan@x.cz"), "jan%40x.cz");
        assert_eq!(urlencode("a+b@x.cz"), "a%2Bb%40x.cz");
        assert_eq!(urlencode("plain-name_1.2~"), "plain-name_1.2~");
    }
}
